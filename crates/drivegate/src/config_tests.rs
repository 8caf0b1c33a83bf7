// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::Parser;

use super::{DriveConfig, GOOGLE_TOKEN_URL};

fn parse(args: &[&str]) -> DriveConfig {
    DriveConfig::parse_from(args)
}

#[test]
fn defaults_are_valid() -> anyhow::Result<()> {
    let config = parse(&["drivegate"]);
    config.validate()?;
    assert_eq!(config.port, 9810);
    assert_eq!(config.http_timeout_secs, 30);
    assert_eq!(config.token_endpoint, GOOGLE_TOKEN_URL);
    Ok(())
}

#[test]
fn redirect_uri_is_derived_from_base_url() -> anyhow::Result<()> {
    let config = parse(&["drivegate", "--base-url", "https://app.example.com/"]);
    assert_eq!(config.redirect_uri(), "https://app.example.com/drive/callback");
    assert_eq!(config.admin_url(), "https://app.example.com/admin/drive");
    Ok(())
}

#[test]
fn explicit_admin_url_wins() -> anyhow::Result<()> {
    let config = parse(&["drivegate", "--admin-url", "https://admin.example.com/drive?tab=1"]);
    assert_eq!(config.admin_url(), "https://admin.example.com/drive?tab=1");
    Ok(())
}

#[test]
fn explicit_state_dir_wins() -> anyhow::Result<()> {
    let config = parse(&["drivegate", "--state-dir", "/var/lib/drivegate"]);
    assert_eq!(config.state_dir(), PathBuf::from("/var/lib/drivegate"));
    Ok(())
}

#[test]
fn endpoints_strip_trailing_slashes() -> anyhow::Result<()> {
    let config = parse(&["drivegate", "--api-base", "http://localhost:1/drive/v3/"]);
    assert_eq!(config.endpoints().api_base, "http://localhost:1/drive/v3");
    Ok(())
}

#[yare::parameterized(
    zero_timeout   = { &["drivegate", "--http-timeout-secs", "0"], "greater than zero" },
    bad_format     = { &["drivegate", "--log-format", "xml"], "--log-format" },
    bad_base_url   = { &["drivegate", "--base-url", "ftp://host"], "--base-url" },
)]
fn invalid_config(args: &[&str], expected_substr: &str) {
    let config = parse(args);
    crate::assert_err_contains!(config.validate(), expected_substr);
}
