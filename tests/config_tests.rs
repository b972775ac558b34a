//! Tests for environment-driven configuration.
//!
//! These mutate process environment, so they run serially.

mod helpers;

use helpers::TestEnv;
use recboot::{BootContext, Config, DryRunLoader};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};

const KEYS: &[&str] = &[
    "RECBOOT_PREFIX",
    "RECBOOT_KERNEL_DIR",
    "RECBOOT_CONF_DIR",
    "RECBOOT_BOOT_DIR",
    "RECBOOT_VENDOR_PREFIX",
    "RECBOOT_OS_NAME",
    "RECBOOT_IMAGE_MODE",
    "RECBOOT_NO_MOUNT",
];

fn clear_env() {
    for key in KEYS {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_env_overrides_dotenv() {
    clear_env();
    let env_dir = TestEnv::new();
    std::fs::write(
        env_dir.prefix.join(".env"),
        "RECBOOT_CONF_DIR=/etc/from-dotenv\nRECBOOT_OS_NAME=\"Dotenv OS\"\n",
    )
    .unwrap();
    env::set_var("RECBOOT_OS_NAME", "Env OS");

    let config = Config::load(&env_dir.prefix);
    assert_eq!(config.conf_dir, PathBuf::from("/etc/from-dotenv"));
    assert_eq!(config.os_name, "Env OS");

    clear_env();
}

#[test]
#[serial]
fn test_prefix_from_env_selects_image_mode() {
    clear_env();
    let env_dir = TestEnv::new();
    env::set_var("RECBOOT_PREFIX", &env_dir.prefix);
    env::set_var("RECBOOT_NO_MOUNT", "1");

    let config = Config::load(&env_dir.prefix);
    assert_eq!(config.prefix, env_dir.prefix);
    assert!(config.image_mode);
    assert!(!config.can_mount);

    let ctx = BootContext::from_config(&config, Box::new(DryRunLoader::new()));
    assert_eq!(
        ctx.timeout_path().unwrap(),
        env_dir.prefix.join("etc/kernel/timeout")
    );

    clear_env();
}

#[test]
#[serial]
fn test_with_prefix_override() {
    clear_env();
    let env_dir = TestEnv::new();

    let config = Config::load(&env_dir.prefix);
    assert!(!config.image_mode);

    let config = config.with_prefix(Path::new("/mnt/image"));
    assert_eq!(config.prefix, PathBuf::from("/mnt/image"));
    assert!(config.image_mode);

    let config = config.with_prefix(Path::new("/"));
    assert!(!config.image_mode);
}

#[test]
#[serial]
fn test_with_prefix_respects_pinned_image_mode() {
    clear_env();
    let env_dir = TestEnv::new();
    env::set_var("RECBOOT_IMAGE_MODE", "0");

    let config = Config::load(&env_dir.prefix).with_prefix(Path::new("/mnt/image"));
    assert_eq!(config.prefix, PathBuf::from("/mnt/image"));
    assert!(!config.image_mode);

    let ctx = BootContext::from_config(&config, Box::new(DryRunLoader::new()));
    assert!(!ctx.image_mode());

    clear_env();
}

#[test]
#[serial]
fn test_dotenv_pins_image_mode() {
    clear_env();
    let env_dir = TestEnv::new();
    std::fs::write(env_dir.prefix.join(".env"), "RECBOOT_IMAGE_MODE=yes\n").unwrap();

    let config = Config::load(&env_dir.prefix).with_prefix(Path::new("/"));
    assert!(config.image_mode);

    clear_env();
}
