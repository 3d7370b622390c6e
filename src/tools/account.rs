//! Identity tools: password check in explicit mode, device activation in
//! cached mode

use serde_json::{json, Value};

use super::{
    object_schema, parse_args, password_property, PasswordArg, ToolDefinition, ToolRegistry,
    ACCOUNT_STATUS, ACTIVATE_ACCOUNT, DEACTIVATE_ACCOUNT, SETUP_PASSWORD,
};
use crate::auth::DeviceState;
use crate::config::AuthMode;
use crate::types::Result;

pub(super) fn definitions(mode: AuthMode, min_secret_len: usize) -> Vec<ToolDefinition> {
    let password_only = object_schema(
        json!({ "password": password_property(min_secret_len) }),
        &["password"],
    );

    match mode {
        AuthMode::Explicit => vec![ToolDefinition {
            name: SETUP_PASSWORD,
            description: "Check a password before using it: tells you whether it opens an existing task list or will start a new one. Saves nothing.".to_string(),
            input_schema: password_only,
        }],
        AuthMode::Cached => vec![
            ToolDefinition {
                name: ACTIVATE_ACCOUNT,
                description: "Activate this device with your password. After that, task tools work without it.".to_string(),
                input_schema: password_only,
            },
            ToolDefinition {
                name: DEACTIVATE_ACCOUNT,
                description: "Forget the account on this device. Your tasks are kept.".to_string(),
                input_schema: object_schema(json!({}), &[]),
            },
            ToolDefinition {
                name: ACCOUNT_STATUS,
                description: "Show whether this device is activated.".to_string(),
                input_schema: object_schema(json!({}), &[]),
            },
        ],
    }
}

impl ToolRegistry {
    pub(super) async fn setup_password(&self, arguments: Value) -> Result<String> {
        let args: PasswordArg = parse_args(SETUP_PASSWORD, arguments)?;
        let resolution = self.auth.check_password(args.require()?).await?;

        Ok(if resolution.is_new_owner {
            "This password is not in use yet. Your account will be created when you add your first task. Keep the password safe: it cannot be recovered.".to_string()
        } else {
            "This password opens your existing task list.".to_string()
        })
    }

    pub(super) async fn activate_account(&self, arguments: Value) -> Result<String> {
        let args: PasswordArg = parse_args(ACTIVATE_ACCOUNT, arguments)?;
        let activation = self.auth.activate(args.require()?).await?;

        Ok(if activation.already_active {
            "This device is already activated for your account.".to_string()
        } else if activation.is_new_owner {
            "Device activated for a new account. It is created when you add your first task.".to_string()
        } else {
            "Device activated. Your existing tasks are available.".to_string()
        })
    }

    pub(super) async fn deactivate_account(&self) -> Result<String> {
        Ok(if self.auth.deactivate().await? {
            "Device deactivated. Your tasks are kept; activate again with your password to reach them.".to_string()
        } else {
            "This device was not activated.".to_string()
        })
    }

    pub(super) async fn account_status(&self) -> Result<String> {
        let status = self.auth.device_status().await?;
        Ok(match (status.state, status.activated_at) {
            (DeviceState::Activated, Some(at)) => {
                format!("Activated since {}.", at.format("%Y-%m-%d %H:%M UTC"))
            }
            (DeviceState::Activated, None) => "Activated.".to_string(),
            (DeviceState::Unactivated, _) => {
                "Not activated. Use activate_account with your password.".to_string()
            }
        })
    }
}
