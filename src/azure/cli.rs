//! Azure CLI command execution.
//!
//! Provides utilities for running Azure CLI commands and turning their
//! failures into [`PeeringError`]s.

use crate::error::{PeeringError, Result};
use colored::Colorize;
use regex::Regex;
use std::sync::OnceLock;
use tokio::process::Command;

/// Maximum accepted stdout size for a single command.
const MAX_OUTPUT_BYTES: usize = 500_000;

/// Regex for splitting command strings while preserving quoted substrings.
static COMMAND_REGEX: OnceLock<Regex> = OnceLock::new();

/// Regex for the Azure error code, e.g. `(ResourceNotFound)` or `Code: NotFound`.
static ERROR_CODE_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_command_regex() -> &'static Regex {
    COMMAND_REGEX.get_or_init(|| {
        Regex::new(r#"'([^']*)'\s*|\"([^\"]*)\"\s*|([^'\s]*)\s*"#).expect("Invalid Regex")
    })
}

fn get_error_code_regex() -> &'static Regex {
    ERROR_CODE_REGEX.get_or_init(|| {
        Regex::new(r"\(([A-Za-z]+)\)|Code:\s*([A-Za-z]+)").expect("Invalid Regex")
    })
}

/// Run a shell command and return its stdout.
///
/// The command string is split on spaces, with quoted substrings preserved.
/// A failing command is mapped onto the error taxonomy by [`classify_az_error`].
pub async fn run(cmd: &str) -> Result<String> {
    log::debug!("run({cmd})", cmd = cmd.on_blue());

    let cmds: Vec<&str> = split_and_strip(cmd);
    log::trace!("split cmds={:?}", cmds);
    let (program, args) = cmds
        .split_first()
        .ok_or_else(|| PeeringError::Provider("empty command".to_string()))?;

    let output = Command::new(program).args(args).output().await.map_err(|e| {
        log::error!("Command execution failed: {}", e);
        PeeringError::ProviderUnavailable(format!("failed to execute {program}: {e}"))
    })?;

    if output.status.success() {
        log::debug!("Success cmd: {cmd}");
        log::debug!("Success output.stdout.len(): {}", output.stdout.len());

        if output.stdout.len() > MAX_OUTPUT_BYTES {
            return Err(PeeringError::Provider(format!(
                "Response too large: {} bytes for command: {:?}",
                output.stdout.len(),
                cmds
            )));
        }
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        log::trace!(
            "code={code:?}, status={status}\n┎######\nstderr=\n{stderr}\n┖######",
            code = output.status.code(),
            status = output.status,
            stderr = stderr.red()
        );
        log::warn!(
            "{failed} to run {cmd}",
            failed = "failed".on_red(),
            cmd = cmd.on_blue()
        );
        return Err(classify_az_error(cmd, &stderr));
    }

    String::from_utf8(output.stdout)
        .map_err(|e| PeeringError::Provider(format!("Invalid UTF-8 from {program}: {e}")))
}

/// Map `az` error output onto the error taxonomy using the Azure error code.
pub fn classify_az_error(cmd: &str, stderr: &str) -> PeeringError {
    let code = get_error_code_regex()
        .captures(stderr)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    let message = format!("{cmd}: {}", stderr.trim());

    match code.as_str() {
        "ResourceNotFound" | "NotFound" | "ResourceGroupNotFound" | "ParentResourceNotFound" => {
            PeeringError::NotFound(message)
        }
        c if c.contains("AddressSpace") && c.contains("Overlap") => {
            PeeringError::AddressSpaceOverlap(message)
        }
        c if c.starts_with("InUse") || c.ends_with("InUse") => PeeringError::NetworkInUse(message),
        c if c.contains("AlreadyExists") || c.contains("Duplicate") => {
            PeeringError::DuplicateName(message)
        }
        c if c.contains("CannotChange") || c.contains("CannotBeModified") => {
            PeeringError::ImmutableFieldViolation(message)
        }
        "TooManyRequests" | "ServerTimeout" | "ServiceUnavailable" | "InternalServerError"
        | "RetryableError" | "AnotherOperationInProgress" => {
            PeeringError::ProviderUnavailable(message)
        }
        _ => PeeringError::Provider(message),
    }
}

/// Split a command string on spaces, preserving quoted substrings.
fn split_and_strip(input: &str) -> Vec<&str> {
    get_command_regex()
        .find_iter(input)
        .map(|m| m.as_str().trim().trim_matches('\'').trim_matches('"'))
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_az_command() {
        let input = "az network vnet peering list -g rg1 --vnet-name 'vnet 1' --output json";
        let expected = vec![
            "az", "network", "vnet", "peering", "list", "-g", "rg1", "--vnet-name", "vnet 1",
            "--output", "json",
        ];
        assert_eq!(split_and_strip(input), expected);
    }

    #[test]
    fn test_split_nospaces() {
        assert_eq!(split_and_strip("az"), vec!["az"]);
        assert!(split_and_strip("   ").is_empty());
    }

    #[test]
    fn test_split_set_arguments() {
        let input = "az network vnet peering update --set allowForwardedTraffic=true";
        assert_eq!(
            split_and_strip(input).last(),
            Some(&"allowForwardedTraffic=true")
        );
    }

    #[test]
    fn test_classify_not_found() {
        let stderr = "ERROR: (ResourceNotFound) The Resource 'Microsoft.Network/virtualNetworks/vnet9' under resource group 'rg' was not found.\nCode: ResourceNotFound";
        assert!(classify_az_error("az network vnet show", stderr).is_not_found());
    }

    #[test]
    fn test_classify_overlap() {
        let stderr = "ERROR: (VnetAddressSpacesOverlap) Cannot create or update peering because address spaces overlap.";
        assert!(matches!(
            classify_az_error("az network vnet peering create", stderr),
            PeeringError::AddressSpaceOverlap(_)
        ));
    }

    #[test]
    fn test_classify_in_use_and_transient() {
        let in_use = "ERROR: (InUseVirtualNetworkCannotBeDeleted) Virtual network vnet1 is in use.";
        assert!(matches!(
            classify_az_error("az network vnet delete", in_use),
            PeeringError::NetworkInUse(_)
        ));
        let throttled = "ERROR: (TooManyRequests) Rate limit exceeded.";
        assert!(classify_az_error("az network vnet show", throttled).is_transient());
    }

    #[test]
    fn test_classify_unknown_keeps_command() {
        let err = classify_az_error("az group create", "ERROR: something odd");
        match err {
            PeeringError::Provider(msg) => assert!(msg.starts_with("az group create"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
