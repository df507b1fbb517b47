use axum_test::TestResponse;
use lets_expect::{AssertionError, AssertionResult};

fn assert_status_code(response: &TestResponse, expected: u16) -> AssertionResult {
    if response.status_code() == expected {
        Ok(())
    } else {
        Err(AssertionError::new(vec![format!(
            "Expected status code {}, got {}",
            expected,
            response.status_code()
        )]))
    }
}

pub fn respond_ok(response: &TestResponse) -> AssertionResult {
    assert_status_code(response, 200)
}

pub fn be_forbidden(response: &TestResponse) -> AssertionResult {
    assert_status_code(response, 403)
}

/// A misconfigured model is answered with 500.
pub fn be_server_error(response: &TestResponse) -> AssertionResult {
    assert_status_code(response, 500)
}

/// Check the `permissions` object a [`PermissionsField`](crate::field::PermissionsField)
/// wrote into a JSON body.
pub fn report_permission(response: &TestResponse, action: &str, expected: bool) -> AssertionResult {
    let body = response.json::<serde_json::Value>();
    let reported = body
        .get("permissions")
        .and_then(|permissions| permissions.get(action))
        .and_then(serde_json::Value::as_bool);

    if reported == Some(expected) {
        Ok(())
    } else {
        Err(AssertionError::new(vec![format!(
            "Expected permission '{action}' to be {expected}, got {reported:?}"
        )]))
    }
}
