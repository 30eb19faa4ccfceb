use std::collections::HashSet;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::Value;

/// Decoded token result. Opaque JSON claims; only `roles` is interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity(Arc<Value>);

impl Identity {
    pub fn new(claims: Value) -> Self {
        Self(Arc::new(claims))
    }

    pub fn claims(&self) -> &Value {
        &self.0
    }

    /// Role list, if the claims expose one as an array.
    pub fn roles(&self) -> Option<Vec<&str>> {
        let arr = self.0.get("roles")?.as_array()?;
        Some(arr.iter().filter_map(Value::as_str).collect())
    }

    /// `None` when no role list is exposed at all.
    pub fn has_any_role(&self, allowed: &HashSet<String>) -> Option<bool> {
        self.roles()
            .map(|roles| roles.iter().any(|r| allowed.contains(*r)))
    }

    pub fn to_value(&self) -> Value {
        self.0.as_ref().clone()
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn allowed(roles: &[&str]) -> HashSet<String> {
        roles.iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn role_intersection() {
        let admin = allowed(&["admin"]);
        let user = Identity::new(json!({"sub": "u1", "roles": ["user"]}));
        let both = Identity::new(json!({"sub": "u2", "roles": ["admin", "user"]}));
        assert_eq!(user.has_any_role(&admin), Some(false));
        assert_eq!(both.has_any_role(&admin), Some(true));
    }

    #[test]
    fn missing_or_malformed_roles() {
        let admin = allowed(&["admin"]);
        assert_eq!(Identity::new(json!({"sub": "u"})).has_any_role(&admin), None);
        assert_eq!(Identity::new(json!({"roles": "admin"})).has_any_role(&admin), None);
    }
}
