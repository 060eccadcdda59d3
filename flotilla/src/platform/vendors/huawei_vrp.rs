//! Huawei VRP platform definition.
//!
//! # Prompt Examples
//!
//! ```text
//! <Switch>               # user view
//! [Switch]               # system view
//! [Switch-GigabitEthernet0/0/1]   # interface view
//! ```

use crate::platform::PlatformDefinition;

/// Create the Huawei VRP platform definition.
pub fn platform() -> PlatformDefinition {
    PlatformDefinition::new("huawei_vrp", r"(?m)^[<\[][\w.\-/]{1,63}[>\]]\s*$")
        .with_rejection("Error: Unrecognized command")
        .with_rejection("Error: Incomplete command")
        .with_rejection("Error: Ambiguous command")
        .with_config_mode("system-view", "return")
        .with_save_command("save")
        .with_on_open_command("screen-length 0 temporary")
        .with_command("current_config", "display current-configuration")
        .with_command("version", "display version")
        .with_command("ip_interfaces", "display ip interface brief")
        .with_command("mac_table", "display mac-address {}")
}
