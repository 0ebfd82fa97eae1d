//! Department hierarchy resolver
//!
//! Computes ancestor/descendant relationships over the department forest.
//! Traversal is depth-bounded and revisit-detecting so malformed data
//! (cycles, dangling parents) degrades to a logged logical error, never a
//! hang. An unknown department yields an empty result set, not an error:
//! callers treat "no department" as "no access".


use crate::model::Principal;
use crate::storage::OrganizationStore;
use crate::utils::error::Result;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

/// Resolver over the department forest
#[derive(Clone)]
pub struct HierarchyResolver {
    org: Arc<dyn OrganizationStore>,
    max_depth: usize,
}

impl HierarchyResolver {
    /// Create a resolver with the given traversal depth bound
    pub fn new(org: Arc<dyn OrganizationStore>, max_depth: usize) -> Self {
        Self { org, max_depth }
    }

    /// The department plus all transitive children.
    ///
    /// Unknown department id yields an empty set.
    pub async fn descendants(&self, department_id: &str) -> Result<HashSet<String>> {
        if self.org.department(department_id).await?.is_none() {
            return Ok(HashSet::new());
        }

        let mut visited: HashSet<String> = HashSet::new();
        let mut stack: Vec<(String, usize)> = vec![(department_id.to_string(), 0)];

        while let Some((id, depth)) = stack.pop() {
            if !visited.insert(id.clone()) {
                warn!(department = %id, "revisit during descendant traversal, hierarchy is malformed");
                continue;
            }
            if depth >= self.max_depth {
                warn!(department = %id, depth, "descendant traversal exceeded depth bound");
                continue;
            }
            for child in self.org.children_of(&id).await? {
                stack.push((child.id, depth + 1));
            }
        }

        Ok(visited)
    }

    /// Ordered list from the department up to its root, for diagnostics.
    ///
    /// Unknown department id yields an empty list.
    pub async fn ancestors(&self, department_id: &str) -> Result<Vec<String>> {
        let mut chain = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut current = department_id.to_string();

        loop {
            let Some(department) = self.org.department(&current).await? else {
                if !chain.is_empty() {
                    warn!(department = %current, "dangling parent reference in hierarchy");
                }
                break;
            };
            if !seen.insert(current.clone()) {
                warn!(department = %current, "cycle detected during ancestor traversal");
                break;
            }
            chain.push(current.clone());
            if chain.len() > self.max_depth {
                warn!(department = %current, "ancestor traversal exceeded depth bound");
                break;
            }
            match department.parent_id {
                Some(parent) => current = parent,
                None => break,
            }
        }

        Ok(chain)
    }

    /// Whether the department exists and has no parent
    pub async fn is_root(&self, department_id: &str) -> Result<bool> {
        Ok(self
            .org
            .department(department_id)
            .await?
            .is_some_and(|d| d.is_root()))
    }

    /// Whether the principal holds a live membership in `department_id`
    /// and that department is a root. Decides scoping breadth, not
    /// capability grant.
    pub async fn is_top_level_membership(
        &self,
        principal: &Principal,
        department_id: &str,
    ) -> Result<bool> {
        let Some(membership) = self
            .org
            .membership_for_department(&principal.user_id, department_id)
            .await?
        else {
            return Ok(false);
        };
        if !membership.is_live(Utc::now()) {
            return Ok(false);
        }
        self.is_root(department_id).await
    }

    /// The set of departments a membership scopes over: all descendants
    /// for a top-level membership, the department alone otherwise.
    ///
    /// Unknown department id yields an empty set: a membership pointing
    /// at a department the store no longer knows grants nothing.
    pub async fn scoped_department_set(
        &self,
        principal: &Principal,
        membership_department_id: &str,
    ) -> Result<HashSet<String>> {
        if self
            .org
            .department(membership_department_id)
            .await?
            .is_none()
        {
            warn!(department = %membership_department_id,
                "membership references an unknown department");
            return Ok(HashSet::new());
        }
        if self
            .is_top_level_membership(principal, membership_department_id)
            .await?
        {
            self.descendants(membership_department_id).await
        } else {
            Ok(HashSet::from([membership_department_id.to_string()]))
        }
    }
}
