// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::http::HeaderValue;

use super::*;

fn headers_with(auth: Option<&str>) -> anyhow::Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let Some(value) = auth {
        headers.insert("authorization", HeaderValue::from_str(value)?);
    }
    Ok(headers)
}

#[yare::parameterized(
    disabled       = { None, None, true },
    disabled_extra = { None, Some("Bearer anything"), true },
    matching       = { Some("s3cret"), Some("Bearer s3cret"), true },
    missing        = { Some("s3cret"), None, false },
    wrong          = { Some("s3cret"), Some("Bearer nope"), false },
    wrong_length   = { Some("s3cret"), Some("Bearer s3cre"), false },
    wrong_scheme   = { Some("s3cret"), Some("Basic s3cret"), false },
)]
fn bearer_validation(expected: Option<&str>, header: Option<&str>, ok: bool) -> anyhow::Result<()> {
    let result = validate_bearer(&headers_with(header)?, expected);
    assert_eq!(result.is_ok(), ok, "got {result:?}");
    if !ok {
        assert_eq!(result, Err(ErrorCode::Unauthorized));
    }
    Ok(())
}

#[test]
fn constant_time_eq_compares_content() {
    assert!(constant_time_eq("abc", "abc"));
    assert!(!constant_time_eq("abc", "abd"));
    assert!(!constant_time_eq("abc", "ab"));
    assert!(constant_time_eq("", ""));
}
