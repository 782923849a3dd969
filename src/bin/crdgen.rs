//! # CRD Generator
//!
//! Prints the CustomResourceDefinition YAML for the managed kinds.
//!
//! ```bash
//! # Every kind, as a multi-document stream
//! cargo run --bin crdgen > config/crd/all.yaml
//!
//! # One kind, applied directly
//! cargo run --bin crdgen -- --kind vault | kubectl apply -f -
//! ```

use clap::Parser;
use oci_service_operator::crd::crds;

/// Generate CRD manifests for the OCI Service Operator
#[derive(Parser, Debug)]
#[command(name = "crdgen")]
struct Cli {
    /// Only print this kind (case-insensitive, e.g. `Stream`, `autonomousdatabase`)
    #[arg(short, long, value_name = "KIND")]
    kind: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let selected: Vec<_> = crds()
        .into_iter()
        .filter(|(kind, _)| {
            cli.kind
                .as_deref()
                .is_none_or(|wanted| kind.eq_ignore_ascii_case(wanted))
        })
        .collect();

    if selected.is_empty() {
        let known: Vec<_> = crds().into_iter().map(|(kind, _)| kind).collect();
        eprintln!(
            "Unknown kind {:?}; expected one of: {}",
            cli.kind.unwrap_or_default(),
            known.join(", ")
        );
        std::process::exit(2);
    }

    println!("# This file is auto-generated by crdgen");
    println!("# DO NOT EDIT THIS FILE MANUALLY");
    println!("# Change the CRD types under src/crd/ and regenerate");
    for (kind, crd) in selected {
        match serde_yaml::to_string(&crd) {
            Ok(yaml) => {
                println!("---");
                print!("{yaml}");
            }
            Err(e) => {
                eprintln!("Failed to serialize {kind} CRD to YAML: {e}");
                std::process::exit(1);
            }
        }
    }
}
