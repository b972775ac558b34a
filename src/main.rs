//! recboot - inspect the boot environment and manage boot-loader tunables.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use recboot::kernel::duplicate_groups;
use recboot::host::{find_boot_device, mountpoint_for_device};
use recboot::{
    fingerprint, is_mounted, resolve_part_uuid, resolve_uuid, BootContext, Config, DryRunLoader,
};

#[derive(Parser)]
#[command(name = "recboot")]
#[command(about = "LevitateOS boot environment inspector")]
#[command(
    after_help = "QUICK START:\n  recboot show            Inspect and print the boot context\n  recboot timeout set 5   Set the boot menu timeout\n  recboot --prefix /mnt/img timeout get"
)]
struct Cli {
    /// Operate on an alternate root instead of the running system
    #[arg(long, global = true)]
    prefix: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get or set the boot menu timeout
    Timeout {
        #[command(subcommand)]
        action: TimeoutAction,
    },

    /// Print the content fingerprint of a file
    Hash { path: PathBuf },

    /// Print the filesystem UUID backing a path (requires root)
    Uuid {
        path: PathBuf,
        /// Print the partition entry UUID (PARTUUID) instead
        #[arg(long)]
        partition: bool,
    },

    /// Check whether a path is a mount point
    Mounted {
        path: PathBuf,
        /// Require the mount to come from this device
        #[arg(long)]
        device: Option<String>,
    },

    /// Show where the boot partition is and where it's mounted
    BootDevice,

    /// List kernel images and flag identical ones
    Kernels,

    /// Inspect and print the boot context
    Show {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print loaded configuration
    Config,
}

#[derive(Subcommand)]
enum TimeoutAction {
    /// Print the timeout (-1 when unset)
    Get,
    /// Set the timeout in seconds; 0 or less clears it
    Set {
        #[arg(allow_negative_numbers = true)]
        seconds: i32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let base_dir = std::env::current_dir()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut config = Config::load(&base_dir);
    if let Some(prefix) = &cli.prefix {
        config = config.with_prefix(prefix);
    }
    let mut ctx = BootContext::from_config(&config, Box::new(DryRunLoader::new()));

    match cli.command {
        Commands::Timeout { action } => match action {
            TimeoutAction::Get => println!("{}", recboot::get_timeout(&ctx)),
            TimeoutAction::Set { seconds } => {
                if !ctx.update_timeout(seconds) {
                    bail!("Failed to update boot timeout");
                }
            }
        },

        Commands::Hash { path } => match fingerprint(&path) {
            Some(sha) => println!("{}  {}", sha, path.display()),
            None => bail!("Cannot fingerprint {}", path.display()),
        },

        Commands::Uuid { path, partition } => {
            let (uuid, kind) = if partition {
                (resolve_part_uuid(&path), "partition")
            } else {
                (resolve_uuid(&path), "filesystem")
            };
            match uuid {
                Some(uuid) => println!("{}", uuid),
                None => bail!("Failed to get {} UUID for {}", kind, path.display()),
            }
        }

        Commands::Mounted { path, device } => {
            let mounted = is_mounted(&path, device.as_deref());
            println!("{}", if mounted { "mounted" } else { "not mounted" });
            if !mounted {
                std::process::exit(1);
            }
        }

        Commands::BootDevice => {
            let Some(device) = find_boot_device() else {
                bail!("Unable to determine a boot device");
            };
            println!("Boot device: {}", device.display());
            match mountpoint_for_device(&device.to_string_lossy()) {
                Some(mnt) => println!("Mounted at:  {}", mnt.display()),
                None => println!("Mounted at:  (not mounted)"),
            }
        }

        Commands::Kernels => {
            let images = ctx.scan_kernels();
            if images.is_empty() {
                println!("No kernels found");
            }
            for image in &images {
                let sha = image.fingerprint.as_deref().unwrap_or("(unreadable)");
                println!("{}  {}", sha, image.path.display());
            }
            for group in duplicate_groups(&images) {
                let names: Vec<String> = group.iter().map(|i| i.path.display().to_string()).collect();
                println!("Identical: {}", names.join(", "));
            }
        }

        Commands::Show { json } => {
            ctx.resolve_root_uuid();
            ctx.resolve_boot_dir();
            ctx.detect_native_kernel();
            let facts = ctx.facts();

            if json {
                println!("{}", serde_json::to_string_pretty(&facts)?);
            } else {
                print_facts(&facts, ctx.boot_is_mounted(None));
            }
        }

        Commands::Config => config.print(),
    }

    Ok(())
}

fn print_facts(facts: &recboot::BootFacts, boot_mounted: bool) {
    let show = |p: &Option<PathBuf>| {
        p.as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(unset)".to_string())
    };

    println!("Boot context:");
    println!("  Prefix:        {}", show(&facts.prefix));
    println!("  Kernel dir:    {}", show(&facts.kernel_dir));
    println!("  Config dir:    {}", show(&facts.config_dir));
    println!("  Boot dir:      {}", show(&facts.abs_boot_dir));
    println!("  Boot mounted:  {}", if boot_mounted { "yes" } else { "no" });
    println!("  Boot loader:   {}", facts.bootloader);
    println!("  OS:            {} ({})", facts.os_name, facts.vendor_prefix);
    println!(
        "  Root UUID:     {}",
        facts.root_uuid.as_deref().unwrap_or("(unresolved)")
    );
    match &facts.native_kernel {
        Some(k) => println!("  Native kernel: {}-{}.{}", k.version, k.release, k.ktype),
        None => println!("  Native kernel: (none)"),
    }
    println!("  Image mode:    {}", if facts.image_mode { "yes" } else { "no" });
    println!("  Can mount:     {}", if facts.can_mount { "yes" } else { "no" });
    if facts.timeout > 0 {
        println!("  Timeout:       {}s", facts.timeout);
    } else {
        println!("  Timeout:       (none)");
    }
}
