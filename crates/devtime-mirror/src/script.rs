//! Request scripts for a deployed service's test cases.

use devtime_core::remote::TestCase;

/// Render test cases as a flat request script, one block per test:
///
/// ```text
/// ### <name>
/// POST <endpoint>/<service uri>[/<operation>]
///
/// <input as pretty JSON>
/// ```
///
/// Only CRUD services address an operation; `operation` on query and sql
/// test cases is ignored.
pub fn render_test_script(
    endpoint: &str,
    service_uri: &str,
    crud: bool,
    tests: &[TestCase],
) -> serde_json::Result<String> {
    let base = format!(
        "{}/{}",
        endpoint.trim_end_matches('/'),
        service_uri.trim_matches('/')
    );
    let mut script = String::new();
    for test in tests {
        let url = match (crud, test.operation.as_deref()) {
            (true, Some(operation)) if !operation.is_empty() => format!("{}/{}", base, operation),
            _ => base.clone(),
        };
        script.push_str(&format!("### {}\n", test.name));
        script.push_str(&format!("POST {}\n\n", url));
        script.push_str(&serde_json::to_string_pretty(&test.input)?);
        script.push_str("\n\n");
    }
    Ok(script)
}
