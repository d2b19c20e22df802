//! wsl-attach-switch CLI

use std::process::ExitCode;
use clap::{error::ErrorKind, Parser};
use wsl_attach_switch::{AttachOutcome, Attacher, HostControl, MacAddress, ParamStore, Params, VlanId};

#[derive(Parser)]
#[command(name = "wsl-attach-switch")]
#[command(about = "Attach a Hyper-V virtual switch to the WSL2 virtual machine", long_about = None)]
#[command(version)]
struct Cli {
    /// Name or GUID of the virtual switch (see `hnsdiag list networks`).
    /// Defaults to the last successfully used parameters.
    network: Option<String>,

    /// Use this physical address for the virtual interface instead of a random one
    #[arg(long, value_parser = parse_mac)]
    mac: Option<MacAddress>,

    /// Enable VLAN filtering with this VLAN ID (0-4095)
    #[arg(long, value_parser = parse_vlan, allow_negative_numbers = true)]
    vlan: Option<VlanId>,

    /// Don't remember these parameters for the next run
    #[arg(long)]
    no_save: bool,
}

fn parse_mac(s: &str) -> Result<MacAddress, String> {
    s.parse().map_err(|e: wsl_attach_switch::Error| e.to_string())
}

fn parse_vlan(s: &str) -> Result<VlanId, String> {
    s.parse().map_err(|e: wsl_attach_switch::Error| e.to_string())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("wsl_attach_switch=info".parse().expect("static directive")),
        )
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if is_informational(e.kind()) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            };
        }
    };

    match run(&cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Help and version output are not failures
fn is_informational(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::DisplayHelp | ErrorKind::DisplayVersion)
}

fn run(cli: &Cli) -> wsl_attach_switch::Result<AttachOutcome> {
    let params = resolve_params(cli, ParamStore::user_default)?;
    let request = params.to_request()?;

    let host = native_host()?;
    let outcome = Attacher::new(host.as_ref()).attach(&request)?;

    if cli.network.is_some() && !cli.no_save {
        remember(ParamStore::user_default(), &params);
    }
    Ok(outcome)
}

/// Explicit parameters win; the store is only located when falling back to it.
fn resolve_params<F>(cli: &Cli, locate_store: F) -> wsl_attach_switch::Result<Params>
where
    F: FnOnce() -> wsl_attach_switch::Result<ParamStore>,
{
    let mac = cli.mac.as_ref().map(MacAddress::as_str);
    let vlan = cli.vlan.map(i64::from);
    match Params::explicit(cli.network.as_deref(), mac, vlan) {
        Some(params) => Ok(params),
        None => locate_store()?.resolve(None, mac, vlan),
    }
}

fn remember(store: wsl_attach_switch::Result<ParamStore>, params: &Params) {
    match store {
        Ok(store) => {
            if let Err(e) = store.save(params) {
                tracing::warn!(path = %store.path().display(), error = %e, "Failed to save parameters");
            }
        }
        Err(e) => tracing::warn!(error = %e, "Not saving parameters"),
    }
}

#[cfg(windows)]
fn native_host() -> wsl_attach_switch::Result<Box<dyn HostControl>> {
    Ok(Box::new(wsl_attach_switch::hcs::WindowsHost::new()))
}

#[cfg(not(windows))]
fn native_host() -> wsl_attach_switch::Result<Box<dyn HostControl>> {
    Err(wsl_attach_switch::Error::Unsupported(
        "the Host Compute Service is only available on Windows".into(),
    ))
}
