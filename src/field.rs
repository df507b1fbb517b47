use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use validator::{Validate, ValidationError};

use crate::{
    action::Action,
    checks::Role,
    error::PermissionError,
    request::PermissionRequest,
    table::{DomainTypeProvider, PermissionTable},
};

/// Actions reported when a field does not name its own.
pub const DEFAULT_ACTIONS: [&str; 6] = ["create", "retrieve", "update", "destroy", "write", "read"];

/// Action names are free-form, custom ones included; only blank names are refused.
fn validate_action_names(actions: &Vec<String>) -> Result<(), ValidationError> {
    match actions.iter().position(|action| action.trim().is_empty()) {
        Some(index) => {
            let mut error = ValidationError::new("blank_action");
            error.add_param("index".into(), &index);
            Err(error)
        }
        None => Ok(()),
    }
}

/// Options of a [`PermissionsField`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct FieldConfig {
    /// Actions to report; `None` reports [`DEFAULT_ACTIONS`]
    #[serde(default)]
    #[validate(custom(function = "validate_action_names"))]
    pub actions: Option<Vec<String>>,
    /// Actions reported on top of `actions`
    #[serde(default)]
    #[validate(custom(function = "validate_action_names"))]
    pub additional_actions: Vec<String>,
    /// Report global checks only
    #[serde(default)]
    pub global_only: bool,
    /// Report object checks only
    #[serde(default)]
    pub object_only: bool,
}

impl FieldConfig {
    #[must_use]
    pub fn with_actions<I, A>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.actions = Some(actions.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_additional_actions<I, A>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.additional_actions = actions.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn global_only(mut self) -> Self {
        self.global_only = true;
        self
    }

    #[must_use]
    pub fn object_only(mut self) -> Self {
        self.object_only = true;
        self
    }
}

/// Reports the permissions of the requester on an object.
///
/// User interfaces often need to know what the current user may do with
/// an object. This field runs the same checks the gate runs and produces a
/// map of action to result. Only actions with a registered check are
/// reported: a `read` check does not make `retrieve` show up.
///
/// Global and object results are combined; an action is `true` only if
/// both are. Use `global_only` / `object_only` to report one side alone.
///
/// # Example
/// ```rust,ignore
/// let field = PermissionsField::new(FieldConfig::default().with_additional_actions(["publish"]))?
///     .bind("permissions", Registered::<Post>::new())?;
///
/// let mut body = serde_json::Map::new();
/// body.insert("title".into(), post.title.clone().into());
/// field.serialize_into(&mut body, &post, &request);
/// ```
#[derive(Debug, Clone)]
pub struct PermissionsField {
    actions: Vec<Action>,
    global_only: bool,
    object_only: bool,
}

impl PermissionsField {
    /// # Errors
    /// Returns [`PermissionError::ConflictingFieldModes`] when both
    /// `global_only` and `object_only` are set, or
    /// [`PermissionError::InvalidFieldConfig`] for blank action names.
    pub fn new(config: FieldConfig) -> Result<Self, PermissionError> {
        if config.global_only && config.object_only {
            return Err(PermissionError::ConflictingFieldModes);
        }
        config.validate()?;

        let mut actions: Vec<Action> = match config.actions {
            Some(actions) => actions.into_iter().map(Action::from).collect(),
            None => DEFAULT_ACTIONS.into_iter().map(Action::from).collect(),
        };
        actions.extend(config.additional_actions.into_iter().map(Action::from));

        Ok(Self {
            actions,
            global_only: config.global_only,
            object_only: config.object_only,
        })
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Record which checks the model declares for each configured action.
    ///
    /// # Errors
    /// Returns [`PermissionError::FieldWithoutModel`] when the provider has no model.
    pub fn bind<M, P>(
        self,
        field_name: impl Into<String>,
        provider: P,
    ) -> Result<BoundPermissionsField<M>, PermissionError>
    where
        P: DomainTypeProvider<M>,
    {
        let name = field_name.into();
        let table = provider
            .permission_table()
            .ok_or_else(|| PermissionError::FieldWithoutModel { field: name.clone() })?;

        let mut methods: Vec<(Action, ActionMethods)> = Vec::new();
        for action in self.actions {
            let entry = ActionMethods {
                global: !self.object_only && table.has(&action, Role::Global),
                object: !self.global_only && table.has(&action, Role::Object),
            };
            if !entry.global && !entry.object {
                trace!(field = %name, action = %action, "No checks to report");
                continue;
            }
            if methods.iter().any(|(existing, _)| *existing == action) {
                continue;
            }
            methods.push((action, entry));
        }

        debug!(
            field = %name,
            model = table.model(),
            actions = methods.len(),
            "Bound permissions field"
        );

        Ok(BoundPermissionsField {
            name,
            table,
            methods,
            global_only: self.global_only,
            object_only: self.object_only,
        })
    }
}

/// Which roles have a check for one reported action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionMethods {
    pub global: bool,
    pub object: bool,
}

/// A [`PermissionsField`] bound to a model.
pub struct BoundPermissionsField<M> {
    name: String,
    table: Arc<PermissionTable<M>>,
    methods: Vec<(Action, ActionMethods)>,
    global_only: bool,
    object_only: bool,
}

impl<M> std::fmt::Debug for BoundPermissionsField<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundPermissionsField")
            .field("name", &self.name)
            .field("model", &self.table.model())
            .field("methods", &self.methods)
            .finish()
    }
}

impl<M> BoundPermissionsField<M> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The actions this field reports, with the checks found for each.
    pub fn action_methods(&self) -> &[(Action, ActionMethods)] {
        &self.methods
    }

    /// Evaluate the recorded checks for `object`.
    ///
    /// The object check of an action is skipped once its global check said
    /// no; the reported value stays `false`.
    pub fn to_representation(&self, object: &M, request: &PermissionRequest) -> PermissionResult {
        let mut results = BTreeMap::new();

        for (action, methods) in &self.methods {
            let mut allowed = None;

            if !self.object_only && methods.global {
                allowed = self
                    .table
                    .global_for(action)
                    .map(|check| check.call(request));
            }

            if !self.global_only && methods.object && allowed != Some(false) {
                if let Some(check) = self.table.object_for(action) {
                    allowed = Some(check.call(object, request));
                }
            }

            if let Some(allowed) = allowed {
                results.insert(action.as_str().to_string(), allowed);
            }
        }

        PermissionResult(results)
    }

    /// Write the permission result into an enclosing representation under the field name.
    pub fn serialize_into(
        &self,
        representation: &mut serde_json::Map<String, serde_json::Value>,
        object: &M,
        request: &PermissionRequest,
    ) {
        let result = self.to_representation(object, request);
        representation.insert(self.name.clone(), result.into());
    }
}

/// Map of action name to whether the requester has that permission.
///
/// Keys are ordered by action name, not by the field's configured order,
/// so the serialized object is stable whatever order the actions were
/// listed in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionResult(BTreeMap<String, bool>);

impl PermissionResult {
    pub fn get(&self, action: &str) -> Option<bool> {
        self.0.get(action).copied()
    }

    pub fn contains(&self, action: &str) -> bool {
        self.0.contains_key(action)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(action, allowed)| (action.as_str(), *allowed))
    }
}

impl From<PermissionResult> for serde_json::Value {
    fn from(result: PermissionResult) -> Self {
        Self::Object(
            result
                .0
                .into_iter()
                .map(|(action, allowed)| (action, Self::Bool(allowed)))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    use axum::http::Method;

    use super::*;
    use crate::testing::fixtures::{Dummy, ModelFlags, ACTION_SET};

    fn field(config: FieldConfig, flags: ModelFlags) -> BoundPermissionsField<Dummy> {
        PermissionsField::new(config.with_additional_actions(["custom_action1", "custom_action2"]))
            .unwrap()
            .bind("permissions", flags.table())
            .unwrap()
    }

    /// Check the reported values: specific actions against `specific`,
    /// `read` / `write` against `base`. `None` means "not reported".
    fn run_field_checks(
        field: &BoundPermissionsField<Dummy>,
        specific: Option<bool>,
        base: Option<bool>,
    ) {
        let request = PermissionRequest::new(Method::GET);
        let result = field.to_representation(&Dummy, &request);

        for action in ACTION_SET
            .into_iter()
            .filter(|action| !["partial_update", "list"].contains(action))
        {
            assert_eq!(result.get(action), specific, "action '{action}'");
        }
        for action in ["read", "write"] {
            assert_eq!(result.get(action), base, "action '{action}'");
        }
    }

    #[test]
    fn test_true_base_permissions() {
        let field = field(FieldConfig::default(), ModelFlags::base());

        run_field_checks(&field, None, Some(true));
    }

    #[test]
    fn test_false_base_object_permissions() {
        let flags = ModelFlags {
            base_object: Some(false),
            ..ModelFlags::base()
        };

        run_field_checks(&field(FieldConfig::default(), flags), None, Some(false));
    }

    #[test]
    fn test_false_base_global_permissions() {
        let flags = ModelFlags {
            base_global: Some(false),
            ..ModelFlags::base()
        };

        run_field_checks(&field(FieldConfig::default(), flags), None, Some(false));
    }

    #[test]
    fn test_true_specific_permissions() {
        let flags = ModelFlags {
            base_global: Some(false),
            base_object: Some(false),
            ..ModelFlags::full()
        };

        run_field_checks(&field(FieldConfig::default(), flags), Some(true), Some(false));
    }

    #[test]
    fn test_true_base_not_defined_permissions() {
        let flags = ModelFlags {
            specific_global: Some(true),
            specific_object: Some(true),
            ..ModelFlags::default()
        };

        run_field_checks(&field(FieldConfig::default(), flags), Some(true), None);
    }

    #[test]
    fn test_false_specific_object_permissions() {
        let flags = ModelFlags {
            specific_object: Some(false),
            ..ModelFlags::full()
        };

        run_field_checks(&field(FieldConfig::default(), flags), Some(false), Some(true));
    }

    #[test]
    fn test_false_specific_global_permissions() {
        let flags = ModelFlags {
            specific_global: Some(false),
            ..ModelFlags::full()
        };

        run_field_checks(&field(FieldConfig::default(), flags), Some(false), Some(true));
    }

    #[test]
    fn test_object_only_ignores_global_checks() {
        let flags = ModelFlags {
            base_global: Some(false),
            specific_global: Some(false),
            ..ModelFlags::full()
        };

        let field = field(FieldConfig::default().object_only(), flags);
        run_field_checks(&field, Some(true), Some(true));
    }

    #[test]
    fn test_global_only_ignores_object_checks() {
        let flags = ModelFlags {
            base_object: Some(false),
            specific_object: Some(false),
            ..ModelFlags::full()
        };

        let field = field(FieldConfig::default().global_only(), flags);
        run_field_checks(&field, Some(true), Some(true));
    }

    #[test]
    fn test_global_only_never_calls_object_check() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);
        let table = PermissionTable::<Dummy>::new("TestModel")
            .global("create", |_| true)
            .object("create", move |_, _| {
                flag.store(true, Ordering::SeqCst);
                false
            });

        let field = PermissionsField::new(FieldConfig::default().global_only())
            .unwrap()
            .bind("permissions", Arc::new(table))
            .unwrap();
        let result = field.to_representation(&Dummy, &PermissionRequest::new(Method::GET));

        assert_eq!(result.get("create"), Some(true));
        assert!(!called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_denied_global_check_skips_object_check() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);
        let table = PermissionTable::<Dummy>::new("TestModel")
            .global("update", |_| false)
            .object("update", move |_, _| {
                flag.store(true, Ordering::SeqCst);
                true
            });

        let field = PermissionsField::new(FieldConfig::default())
            .unwrap()
            .bind("permissions", Arc::new(table))
            .unwrap();
        let result = field.to_representation(&Dummy, &PermissionRequest::new(Method::GET));

        assert_eq!(result.get("update"), Some(false));
        assert!(!called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_omits_actions_without_checks() {
        let table = PermissionTable::<Dummy>::new("TestModel").object("destroy", |_, _| true);

        let field = PermissionsField::new(FieldConfig::default())
            .unwrap()
            .bind("permissions", Arc::new(table))
            .unwrap();
        let result = field.to_representation(&Dummy, &PermissionRequest::new(Method::GET));

        assert_eq!(result.len(), 1);
        assert_eq!(result.get("destroy"), Some(true));
        assert!(!result.contains("retrieve"));
    }

    #[test]
    fn test_explicit_actions_replace_defaults() {
        let field = PermissionsField::new(FieldConfig::default().with_actions(["read"]))
            .unwrap()
            .bind("permissions", ModelFlags::full().table())
            .unwrap();

        let reported: Vec<&str> = field
            .action_methods()
            .iter()
            .map(|(action, _)| action.as_str())
            .collect();
        assert_eq!(reported, ["read"]);
    }

    #[test]
    fn test_conflicting_modes_are_rejected() {
        let err = PermissionsField::new(FieldConfig::default().global_only().object_only())
            .unwrap_err();

        assert!(matches!(err, PermissionError::ConflictingFieldModes));
    }

    #[test]
    fn test_blank_action_names_are_rejected() {
        let err = PermissionsField::new(FieldConfig::default().with_additional_actions(["publish", "  "]))
            .unwrap_err();

        assert!(matches!(err, PermissionError::InvalidFieldConfig(_)));
    }

    #[test]
    fn test_reports_custom_actions_with_any_name() {
        let table = PermissionTable::<Dummy>::new("TestModel")
            .global("markRead", |request| request.is_safe())
            .object("markRead", |_, _| true);

        let field = PermissionsField::new(FieldConfig::default().with_additional_actions(["markRead"]))
            .unwrap()
            .bind("permissions", Arc::new(table))
            .unwrap();

        let result = field.to_representation(&Dummy, &PermissionRequest::new(Method::GET));
        assert_eq!(result.get("markRead"), Some(true));

        let result = field.to_representation(&Dummy, &PermissionRequest::new(Method::POST));
        assert_eq!(result.get("markRead"), Some(false));
    }

    #[test]
    fn test_repeated_actions_are_reported_once() {
        let field = PermissionsField::new(
            FieldConfig::default()
                .with_actions(["read"])
                .with_additional_actions(["read"]),
        )
        .unwrap()
        .bind("permissions", ModelFlags::base().table())
        .unwrap();

        assert_eq!(field.action_methods().len(), 1);
        assert_eq!(field.action_methods()[0].0, "read");
        assert_eq!(
            field
                .to_representation(&Dummy, &PermissionRequest::new(Method::GET))
                .len(),
            1
        );
    }

    #[test]
    fn test_result_keys_are_ordered_by_name() {
        let field = PermissionsField::new(FieldConfig::default().with_actions(["write", "read"]))
            .unwrap()
            .bind("permissions", ModelFlags::base().table())
            .unwrap();

        let reported: Vec<&str> = field
            .action_methods()
            .iter()
            .map(|(action, _)| action.as_str())
            .collect();
        assert_eq!(reported, ["write", "read"]);

        let result = field.to_representation(&Dummy, &PermissionRequest::new(Method::GET));
        let keys: Vec<&str> = result.iter().map(|(action, _)| action).collect();
        assert_eq!(keys, ["read", "write"]);
    }

    #[test]
    fn test_bind_without_model_fails() {
        let bound: Result<BoundPermissionsField<Dummy>, _> = PermissionsField::new(FieldConfig::default())
            .unwrap()
            .bind("permissions", None::<Arc<PermissionTable<Dummy>>>);
        let err = bound.unwrap_err();

        assert!(matches!(err, PermissionError::FieldWithoutModel { ref field } if field == "permissions"));
        assert_eq!(err.to_string(), "permissions field 'permissions' is used without a model");
    }

    #[test]
    fn test_serialize_into_uses_field_name() {
        let field = field(FieldConfig::default(), ModelFlags::base());
        let mut representation = serde_json::Map::new();
        representation.insert("test_field".into(), "value".into());

        field.serialize_into(&mut representation, &Dummy, &PermissionRequest::new(Method::GET));

        assert_eq!(
            serde_json::Value::Object(representation),
            serde_json::json!({
                "test_field": "value",
                "permissions": { "read": true, "write": true },
            })
        );
    }

    #[test]
    fn test_field_config_deserializes() {
        let config: FieldConfig =
            serde_json::from_str(r#"{"additional_actions": ["publish"], "object_only": true}"#)
                .unwrap();

        assert_eq!(config.actions, None);
        assert_eq!(config.additional_actions, ["publish"]);
        assert!(config.object_only);
        assert!(!config.global_only);
    }

    #[tokio::test]
    async fn test_reports_permissions_of_the_requesting_principal() {
        use axum::{extract::State, routing::get, Json, Router};
        use axum_test::TestServer;

        use crate::testing::{
            assertions::report_permission,
            setup::{principal_layer, TestUser},
        };

        async fn show(
            State(field): State<Arc<BoundPermissionsField<Dummy>>>,
            request: PermissionRequest,
        ) -> Json<serde_json::Value> {
            let mut representation = serde_json::Map::new();
            field.serialize_into(&mut representation, &Dummy, &request);
            Json(serde_json::Value::Object(representation))
        }

        let table = PermissionTable::<Dummy>::new("TestModel")
            .read(|_| true)
            .write(|request| request.is_authenticated());
        let field = Arc::new(
            PermissionsField::new(FieldConfig::default())
                .unwrap()
                .bind("permissions", Arc::new(table))
                .unwrap(),
        );
        let router = |user: Option<TestUser>| {
            Router::new()
                .route("/dummies/{id}", get(show))
                .layer(principal_layer(user))
                .with_state(Arc::clone(&field))
        };

        let anonymous = TestServer::new(router(None)).unwrap().get("/dummies/1").await;
        assert!(report_permission(&anonymous, "read", true).is_ok());
        assert!(report_permission(&anonymous, "write", false).is_ok());

        let member = TestServer::new(router(Some(TestUser::member())))
            .unwrap()
            .get("/dummies/1")
            .await;
        assert!(report_permission(&member, "write", true).is_ok());
    }
}
