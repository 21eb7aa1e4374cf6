//! Constants and configuration values for tvout
//!
//! Centralizes provider names, wire formats, and configuration defaults.
//! Never use magic strings for provider names in other files - add them here first.

/// Output-property (RandR style) provider names
pub mod randr {
    /// Extension name reported in errors
    pub const EXTENSION: &str = "RANDR";

    /// Output name of the TV connector
    pub const DEFAULT_OUTPUT_NAME: &str = "TV";

    pub const SIGNAL_FORMAT: &str = "SignalFormat";
    pub const SIGNAL_PROPERTIES: &str = "SignalProperties";
    pub const TV_ASPECT_RATIO: &str = "TVAspectRatio";
    pub const TV_SCALE: &str = "TVScale";
    pub const TV_DYNAMIC_ASPECT_RATIO: &str = "TVDynamicAspectRatio";
    pub const TV_X_OFFSET: &str = "TVXOffset";
    pub const TV_Y_OFFSET: &str = "TVYOffset";
    pub const XV_CLONE_FULLSCREEN: &str = "XvCloneFullscreen";

    /// Symbols the driver uses as values of the enumerated properties
    pub mod symbols {
        pub const COMPOSITE_PAL: &str = "Composite-PAL";
        pub const COMPOSITE_NTSC: &str = "Composite-NTSC";
        pub const PAL: &str = "PAL";
        pub const NTSC: &str = "NTSC";
        pub const ASPECT_4_3: &str = "4:3";
        pub const ASPECT_16_9: &str = "16:9";
    }
}

/// Port-attribute (Xv style) provider names
pub mod xv {
    /// Extension name reported in errors
    pub const EXTENSION: &str = "XVideo";

    pub const CLONE_TO_TVOUT: &str = "XV_OMAP_CLONE_TO_TVOUT";
    pub const TVOUT_STANDARD: &str = "XV_OMAP_TVOUT_STANDARD";
    pub const TVOUT_WIDESCREEN: &str = "XV_OMAP_TVOUT_WIDESCREEN";
    pub const TVOUT_SCALE: &str = "XV_OMAP_TVOUT_SCALE";
}

/// Wire format constants
pub mod wire {
    /// Property values are exchanged as 32-bit units
    pub const VALUE_FORMAT: u8 = 32;

    /// Number of items a scalar property must carry
    pub const SCALAR_ITEMS: usize = 1;

    /// Number of values a range property description must carry
    pub const RANGE_BOUNDS: usize = 2;

    /// Symbol id meaning "no symbol"
    pub const NONE: u32 = 0;
}

/// Enable is a boolean pipeline binding
pub mod enable {
    pub const OFF: i64 = 0;
    pub const ON: i64 = 1;
}

/// Configuration defaults
pub mod config {
    /// Environment variable overriding the configuration file location
    pub const CONFIG_ENV: &str = "TVOUT_CONFIG";

    /// Directory below the user configuration directory
    pub const CONFIG_DIR_NAME: &str = "tvout";

    /// Configuration file name
    pub const CONFIG_FILE: &str = "config.json";

    /// Default log level when RUST_LOG is not set
    pub const DEFAULT_LOG_LEVEL: &str = "info";

    /// Log levels accepted in the configuration file
    pub const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

    /// Descriptor reported by simulated providers
    pub const DEFAULT_SIM_DESCRIPTOR: i32 = 3;

    /// Maximum configuration file size in bytes
    pub const MAX_CONFIG_SIZE: u64 = 64 * 1024;
}
