//! CLI argument semantics: flag parsing and device-selection validation.

use clap::Parser;

use rehook::cli::{select_target, Cli, Target};
use rehook::AppError;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).expect("arguments should parse")
}

#[test]
fn list_devices_needs_no_config_path() {
    let cli = parse(&["rehook", "-l"]);
    assert!(cli.list_devices);
    assert!(cli.conf.is_none());
}

#[test]
fn list_devices_long_flag_uses_underscore() {
    let cli = parse(&["rehook", "--list_devices"]);
    assert!(cli.list_devices);
}

#[test]
fn usb_selects_the_usb_target() {
    let cli = parse(&["rehook", "rehook.conf", "-u"]);
    assert_eq!(select_target(&cli).expect("valid"), Target::Usb);
}

#[test]
fn id_selects_the_named_device() {
    let cli = parse(&["rehook", "rehook.conf", "-i", "emulator-5554"]);
    assert_eq!(
        select_target(&cli).expect("valid"),
        Target::Id("emulator-5554".to_owned())
    );
}

#[test]
fn usb_and_id_together_is_a_usage_error() {
    let cli = parse(&["rehook", "rehook.conf", "-u", "-i", "emulator-5554"]);
    let err = select_target(&cli).expect_err("must be rejected");
    let AppError::Usage(message) = err else {
        panic!("expected Usage error, got {err:?}");
    };
    assert!(message.contains("together"), "got: {message}");
}

#[test]
fn neither_usb_nor_id_is_a_usage_error() {
    let cli = parse(&["rehook", "rehook.conf"]);
    let err = select_target(&cli).expect_err("must be rejected");
    assert!(matches!(err, AppError::Usage(_)), "got {err:?}");
}
