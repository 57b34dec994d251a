use docvault::config::{DocVaultConfig, RecoveryMode};
use docvault::offline::{self, RecordCounts};
use std::path::PathBuf;

const USAGE: &str = "\
usage:
  docvault check invariants --dir <data-dir> [--hmac-key-hex <hex>] [--permissive] [--json]
  docvault dump export --dir <data-dir> --out <dump.json> [--hmac-key-hex <hex>] [--permissive] [--json]";

#[derive(Debug, PartialEq)]
enum Command {
    CheckInvariants,
    DumpExport { out: PathBuf },
}

#[derive(Debug)]
struct Invocation {
    command: Command,
    dir: PathBuf,
    config: DocVaultConfig,
    json: bool,
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = parse_invocation(&args).and_then(|invocation| execute(&invocation));
    if let Err(e) = result {
        eprintln!("docvault: {e}");
        std::process::exit(1);
    }
}

fn parse_invocation(args: &[String]) -> Result<Invocation, String> {
    let (group, action) = match args {
        [group, action, ..] => (group.as_str(), action.as_str()),
        _ => return Err(format!("missing command\n{USAGE}")),
    };
    let flags = &args[2..];
    let command = match (group, action) {
        ("check", "invariants") => Command::CheckInvariants,
        ("dump", "export") => Command::DumpExport {
            out: flag_value(flags, "--out")
                .ok_or("--out is required")?
                .into(),
        },
        _ => return Err(format!("unknown command: {group} {action}\n{USAGE}")),
    };
    Ok(Invocation {
        command,
        dir: flag_value(flags, "--dir").ok_or("--dir is required")?.into(),
        config: recovery_config(flags)?,
        json: flags.iter().any(|a| a == "--json"),
    })
}

fn execute(invocation: &Invocation) -> Result<(), String> {
    match &invocation.command {
        Command::CheckInvariants => {
            let report = offline::check_invariants(&invocation.dir, &invocation.config)
                .map_err(|e| format!("check invariants: {e}"))?;
            if invocation.json {
                print_json(&report)?;
            } else {
                let status = if report.ok { "consistent" } else { "inconsistent" };
                println!(
                    "vault {} at checkpoint {}: {status}",
                    invocation.dir.display(),
                    report.checkpoint_seq
                );
                print_counts(&report.counts);
                for violation in &report.violations {
                    println!("violation\t{violation}");
                }
            }
            if report.ok {
                Ok(())
            } else {
                Err(format!("{} invariant violation(s)", report.violations.len()))
            }
        }
        Command::DumpExport { out } => {
            let report = offline::export_json(&invocation.dir, &invocation.config, out)
                .map_err(|e| format!("dump export: {e}"))?;
            if invocation.json {
                return print_json(&report);
            }
            println!(
                "exported checkpoint {} to {} (sha256 {})",
                report.checkpoint_seq,
                out.display(),
                report.sha256_hex
            );
            print_counts(&report.counts);
            Ok(())
        }
    }
}

fn print_counts(counts: &RecordCounts) {
    println!("accounts\tprojects\tgrants\tdocuments");
    println!(
        "{}\t{}\t{}\t{}",
        counts.accounts, counts.projects, counts.grants, counts.documents
    );
}

fn print_json(value: &impl serde::Serialize) -> Result<(), String> {
    let rendered = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{rendered}");
    Ok(())
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|idx| args.get(idx + 1).cloned())
}

fn recovery_config(flags: &[String]) -> Result<DocVaultConfig, String> {
    let mut config = DocVaultConfig::default();
    if flags.iter().any(|a| a == "--permissive") {
        config.recovery_mode = RecoveryMode::Permissive;
    }
    if let Some(hex_key) = flag_value(flags, "--hmac-key-hex") {
        let key = hex::decode(hex_key).map_err(|e| format!("invalid --hmac-key-hex: {e}"))?;
        config = config.with_hmac_key(key);
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}
