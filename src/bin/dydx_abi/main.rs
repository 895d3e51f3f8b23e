//! Command line tool for the dYdX perpetual contract bindings.
//!
//! Prints embedded contract ABIs, encodes calldata, invokes read-only calls,
//! submits transactions and queries or follows contract events.

mod config;
mod error;

use std::process::exit;

use alloy::{
    dyn_abi::DynSolValue,
    hex,
    network::EthereumWallet,
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::client::RpcClient,
    transports::layers::RetryBackoffLayer,
};
use clap::Parser;
use dydx_bindings::{
    CallOptions, DecodedEvent, Descriptor, FilterOptions, FunctionEntry, ProviderBackend,
    TransactOptions, WatchOptions,
    abi::Contract,
    contract::Binding,
    value::{self, CallOutput},
};
use itertools::Itertools;
use tracing::{error, info};

use config::{CliConfig, Command, EnvConfig};
use error::{Error, Result};

#[tokio::main]
async fn main() {
    // Load .env file
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: Failed to load .env file: {}", e);
    }

    // Parse CLI arguments
    let cli_config = CliConfig::parse();

    // Set up logging
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run(cli_config.command).await {
        error!(%e, "Command failed");
        exit(1);
    }
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::List => {
            for contract in Contract::ALL {
                let descriptor = contract.descriptor()?;
                println!(
                    "{contract}: {} function(s), {} event(s)",
                    descriptor.functions().len(),
                    descriptor.events().len()
                );
            }
        }
        Command::Describe { contract } => {
            let descriptor = contract.descriptor()?;
            describe(&descriptor);
        }
        Command::Encode {
            contract,
            function,
            args,
        } => {
            let descriptor = contract.descriptor()?;
            let (function, args) = resolve_call(&descriptor, &function, &args)?;
            println!("{}", hex::encode_prefixed(function.encode_input(&args)?));
        }
        Command::Call {
            contract,
            address,
            function,
            args,
            from,
            block,
        } => {
            let env = EnvConfig::from_env()?;
            let binding = Binding::new(address, contract.descriptor()?);
            let (function, args) = resolve_call(binding.descriptor(), &function, &args)?;

            let mut opts = CallOptions::new();
            if let Some(from) = from {
                opts = opts.from(from);
            }
            if let Some(block) = block {
                opts = opts.at_block(block);
            }

            let caller = binding.caller(backend(&env, false).await?);
            match caller.call(function.binding_name(), &args, &opts).await {
                Ok(output) => print_output(&output),
                Err(err) => {
                    if let Some(reason) = binding.revert_reason(&err) {
                        error!(?reason, "Call reverted");
                    }
                    return Err(err.into());
                }
            }
        }
        Command::Send {
            contract,
            address,
            function,
            args,
            value,
        } => {
            let env = EnvConfig::from_env()?;
            let binding = Binding::new(address, contract.descriptor()?);
            let (function, args) = resolve_call(binding.descriptor(), &function, &args)?;

            let mut opts = TransactOptions::new();
            if let Some(value) = value {
                opts = opts.value(value);
            }

            let transactor = binding.transactor(backend(&env, true).await?);
            let pending = transactor
                .transact(function.binding_name(), &args, &opts)
                .await?;
            info!(tx_hash = %pending.tx_hash(), "Transaction submitted");
        }
        Command::Logs {
            contract,
            address,
            event,
            indexed,
            from_block,
            to_block,
        } => {
            let env = EnvConfig::from_env()?;
            let binding = Binding::new(address, contract.descriptor()?);
            let rules = rules(binding.descriptor(), &event, &indexed)?;
            let opts = match to_block {
                Some(to_block) => FilterOptions::range(from_block, to_block),
                None => FilterOptions::new(from_block),
            };

            let filterer = binding.filterer(backend(&env, false).await?);
            let mut events = filterer.filter(&event, &rules, opts).await?;
            let mut count = 0;
            while events.advance() {
                if let Some(event) = events.event() {
                    print_event(event);
                    count += 1;
                }
            }
            if let Some(err) = events.error() {
                return Err(err.clone().into());
            }
            info!(count, "Done");
        }
        Command::Watch {
            contract,
            address,
            event,
            indexed,
            from_block,
            skip_malformed,
        } => {
            let env = EnvConfig::from_env()?;
            let binding = Binding::new(address, contract.descriptor()?);
            let rules = rules(binding.descriptor(), &event, &indexed)?;
            let mut opts = WatchOptions::new().skip_malformed(skip_malformed);
            if let Some(from_block) = from_block {
                opts = opts.from_block(from_block);
            }

            let filterer = binding.filterer(backend(&env, false).await?);
            let mut subscription = filterer.watch(&event, &rules, &opts).await?;
            info!(%contract, %address, %event, "Watching events");
            while let Some(event) = subscription.recv().await {
                print_event(&event);
            }
            subscription.wait().await?;
        }
    }
    Ok(())
}

async fn backend(env: &EnvConfig, with_signer: bool) -> Result<ProviderBackend<DynProvider>> {
    let node_url = env.node_url()?;
    let poll_interval = env.poll_interval()?;

    // Build RPC client with retry layer
    let client = RpcClient::builder()
        .layer(RetryBackoffLayer::new(10, 100, 200))
        .connect(node_url.as_str())
        .await?;
    client.set_poll_interval(poll_interval);

    let provider = if with_signer {
        let signer = env.signer()?.ok_or(Error::NoSigner)?;
        info!(address = %signer.address(), "Signing with");
        ProviderBuilder::new()
            .wallet(EthereumWallet::new(signer))
            .connect_client(client)
            .erased()
    } else {
        ProviderBuilder::new().connect_client(client).erased()
    };
    Ok(ProviderBackend::new(provider).with_poll_interval(poll_interval))
}

/// Picks the function and parses its arguments.
///
/// Overloads sharing the name are tried in ABI order, the first one the
/// arguments parse for wins.
fn resolve_call<'d>(
    descriptor: &'d Descriptor,
    name: &str,
    raw: &[String],
) -> Result<(&'d FunctionEntry, Vec<DynSolValue>)> {
    let mut candidates = descriptor
        .functions()
        .iter()
        .filter(|f| f.name() == name)
        .collect::<Vec<_>>();
    if candidates.is_empty() {
        candidates.extend(descriptor.function(name));
    }

    let mut last_err = dydx_bindings::Error::UnknownFunction(name.to_string());
    for function in candidates {
        match value::coerce_args(function.input_types(), raw) {
            Ok(args) => return Ok((function, args)),
            Err(err) => last_err = err,
        }
    }
    Err(last_err.into())
}

fn rules(
    descriptor: &Descriptor,
    event: &str,
    indexed: &[String],
) -> Result<Vec<Vec<DynSolValue>>> {
    let entry = descriptor
        .event(event)
        .ok_or_else(|| dydx_bindings::Error::UnknownEvent(event.to_string()))?;
    Ok(config::indexed_rules(entry.indexed_types(), indexed)?)
}

fn describe(descriptor: &Descriptor) {
    if let Some(constructor) = descriptor.constructor() {
        println!(
            "constructor({})",
            constructor.inputs.iter().map(|p| p.selector_type()).join(",")
        );
    }
    if let Some(fallback) = descriptor.fallback() {
        println!("fallback() {}", fallback.state_mutability.as_json_str());
    }
    if descriptor.receive().is_some() {
        println!("receive() payable");
    }

    println!("functions:");
    for f in descriptor.functions() {
        let outputs = f.output_types().iter().join(",");
        println!(
            "  {} {}: {} {}{}",
            f.selector(),
            f.binding_name(),
            f.signature(),
            f.state_mutability().as_json_str(),
            if outputs.is_empty() {
                String::new()
            } else {
                format!(" returns ({outputs})")
            }
        );
    }

    println!("events:");
    for e in descriptor.events() {
        println!(
            "  {} {}: {}{}",
            e.topic(),
            e.binding_name(),
            e.declaration(),
            if e.is_anonymous() { " anonymous" } else { "" }
        );
    }

    if !descriptor.errors().is_empty() {
        println!("errors:");
        for e in descriptor.errors() {
            println!("  {} {}", e.selector(), e.signature());
        }
    }
}

fn print_output(output: &CallOutput) {
    for (idx, (name, value)) in output.fields().iter().enumerate() {
        let name = if name.is_empty() {
            format!("[{idx}]")
        } else {
            name.clone()
        };
        println!("{name}: {}", value::format_value(value));
    }
}

fn print_event(event: &DecodedEvent) {
    println!(
        "block {} tx {} log {}: {}({})",
        event.block_number().unwrap_or_default(),
        event.tx_hash().unwrap_or_default(),
        event.log_index().unwrap_or_default(),
        event.name(),
        event
            .fields()
            .iter()
            .map(|(name, value)| format!("{name}={}", value::format_value(value)))
            .join(", ")
    );
}
