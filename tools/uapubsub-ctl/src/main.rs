// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! OPC UA PubSub control tool
//!
//! # Usage
//!
//! ```bash
//! # Write an example configuration (one publisher and one subscriber connection)
//! uapubsub-ctl gen-config --output pubsub.toml
//!
//! # Validate a configuration file
//! uapubsub-ctl validate --config pubsub.toml
//!
//! # Show the configuration tree with ids and states
//! uapubsub-ctl tree --config pubsub.toml
//!
//! # Run the configuration over the in-process loopback transport for 10 s
//! uapubsub-ctl run --config pubsub.toml --duration 10
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uapubsub::types::{
    BuiltInType, FieldMetaData, PublishedVariable, ReaderGroupDataType, UDP_UADP_PROFILE_URI,
};
use uapubsub::{
    ConfigId, ConfigObject, DataReceivedEventArgs, DataSetMetaData, DataSetReaderDataType,
    DataSetWriterDataType, DataValue, InMemoryDataStore, LoopbackBus, MetaDataReceivedEventArgs,
    PubSubApplication, PubSubConfiguration, PubSubConfigurator, PubSubConnectionDataType,
    PubSubEventListener, PublishedDataSetDataType, PublisherId, WriterGroupDataType,
};

/// OPC UA PubSub control tool
#[derive(Parser, Debug)]
#[command(name = "uapubsub-ctl")]
#[command(about = "Validate, inspect and run OPC UA PubSub configurations")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate example configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "pubsub.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Print the configuration tree with ids and states
    Tree {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Run a configuration over the loopback transport
    Run {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,

        /// Seconds to run (0 runs until Ctrl+C)
        #[arg(short, long, default_value = "10")]
        duration: u64,

        /// Milliseconds between simulated value updates (0 to disable)
        #[arg(long, default_value = "100")]
        simulate_interval: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match args.command {
        Commands::GenConfig { output } => cmd_gen_config(output),
        Commands::Validate { config } => cmd_validate(config),
        Commands::Tree { config } => cmd_tree(config),
        Commands::Run {
            config,
            duration,
            simulate_interval,
        } => cmd_run(config, duration, simulate_interval).await,
    }
}

fn example_configuration() -> PubSubConfiguration {
    let mut pds = PublishedDataSetDataType::new(
        "Simple",
        DataSetMetaData::new(
            "Simple",
            vec![
                FieldMetaData::scalar("Temperature", BuiltInType::Double),
                FieldMetaData::scalar("Pressure", BuiltInType::Double),
            ],
        ),
    );
    pds.published_data = vec![
        PublishedVariable::new("ns=1;s=Temperature").with_substitute(0.0),
        PublishedVariable::new("ns=1;s=Pressure"),
    ];

    let mut group = WriterGroupDataType::new("WriterGroup1", 1, 500.0);
    let mut writer = DataSetWriterDataType::new("Writer1", 1, "Simple").with_key_frame_count(4);
    writer.meta_data_update_time = 5000.0;
    group.data_set_writers.push(writer);
    let mut publisher = PubSubConnectionDataType::new("Publisher", UDP_UADP_PROFILE_URI);
    publisher.publisher_id = PublisherId::UInt16(1);
    publisher.address.url = "opc.udp://239.0.0.1:4840".into();
    publisher.writer_groups.push(group);

    let mut readers = ReaderGroupDataType::new("ReaderGroup1");
    readers.data_set_readers.push(DataSetReaderDataType::new(
        "Reader1",
        PublisherId::UInt16(1),
        1,
        1,
    ));
    let mut subscriber = PubSubConnectionDataType::new("Subscriber", UDP_UADP_PROFILE_URI);
    subscriber.publisher_id = PublisherId::UInt16(2);
    subscriber.address.url = "opc.udp://239.0.0.1:4840".into();
    subscriber.reader_groups.push(readers);

    PubSubConfiguration {
        enabled: true,
        published_data_sets: vec![pds],
        connections: vec![publisher, subscriber],
    }
}

fn cmd_gen_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let toml_str = example_configuration().to_toml_string()?;
    let content = format!(
        r#"# OPC UA PubSub Configuration
# Generated by uapubsub-ctl gen-config

{}
"#,
        toml_str
    );

    std::fs::write(&output, content)?;
    println!("Generated configuration file: {}", output.display());
    Ok(())
}

fn cmd_validate(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    match PubSubConfiguration::from_file(&config_path) {
        Ok(config) => {
            println!("Configuration valid!");
            println!();
            println!("PublishedDataSets: {}", config.published_data_sets.len());
            for pds in &config.published_data_sets {
                println!(
                    "  {} ({} fields)",
                    pds.name,
                    pds.data_set_meta_data.fields.len()
                );
            }
            println!("Connections: {}", config.connections.len());
            for connection in &config.connections {
                println!(
                    "  {} [{}] {} writer groups, {} reader groups",
                    connection.name,
                    connection.transport_profile_uri,
                    connection.writer_groups.len(),
                    connection.reader_groups.len()
                );
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration invalid: {}", e);
            std::process::exit(1);
        }
    }
}

fn render_tree(configurator: &PubSubConfigurator) -> String {
    fn walk(configurator: &PubSubConfigurator, id: ConfigId, depth: usize, out: &mut String) {
        let Some(object) = configurator.find_object_by_id(id) else {
            return;
        };
        let name = match &object {
            ConfigObject::PubSubConfiguration(_) => "PubSubConfiguration",
            other => other.name(),
        };
        out.push_str(&format!(
            "{:indent$}[{}] {} '{}' {}\n",
            "",
            id,
            object.kind(),
            name,
            configurator.find_state_for_id(id),
            indent = depth * 2
        ));
        for child in configurator.find_children_ids(id) {
            walk(configurator, child, depth + 1, out);
        }
    }

    let mut out = String::new();
    walk(
        configurator,
        configurator.pub_sub_configuration_id(),
        0,
        &mut out,
    );
    out
}

fn cmd_tree(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = PubSubConfiguration::from_file(&config_path)?;
    let configurator = PubSubConfigurator::new();
    configurator.load_configuration(config, true)?;
    print!("{}", render_tree(&configurator));
    Ok(())
}

/// Logs what the running application receives.
#[derive(Default)]
struct ReceiveLogger {
    data: AtomicU64,
    meta_data: AtomicU64,
}

impl PubSubEventListener for ReceiveLogger {
    fn on_data_received(&self, args: &DataReceivedEventArgs) {
        self.data.fetch_add(1, Ordering::Relaxed);
        for message in args.network_message.data_set_messages() {
            let values: Vec<String> = message
                .data_set
                .fields
                .iter()
                .map(|f| match f {
                    Some(field) => format!("{:?}", field.value.value),
                    None => "-".to_string(),
                })
                .collect();
            info!(
                "Data from {} writer {} seq {}{}: [{}]",
                args.source,
                message.data_set_writer_id,
                message.sequence_number,
                if message.is_delta_frame() { " (delta)" } else { "" },
                values.join(", ")
            );
        }
    }

    fn on_meta_data_received(&self, args: &MetaDataReceivedEventArgs) {
        self.meta_data.fetch_add(1, Ordering::Relaxed);
        if let Some(meta_data) = args.network_message.data_set_meta_data() {
            info!(
                "MetaData '{}' v{}.{} from {}",
                meta_data.name,
                meta_data.configuration_version.major_version,
                meta_data.configuration_version.minor_version,
                args.source
            );
        }
    }
}

/// Write changing values for every published variable.
fn spawn_simulator(
    application: Arc<PubSubApplication>,
    store: Arc<InMemoryDataStore>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        let mut tick = 0u64;
        loop {
            ticker.tick().await;
            tick += 1;
            let config = application.configurator().configuration();
            for pds in &config.published_data_sets {
                for (index, variable) in pds.published_data.iter().enumerate() {
                    let value = (tick as f64) * 0.1 + index as f64;
                    store.write(&variable.published_variable, DataValue::new(value));
                }
            }
        }
    })
}

async fn cmd_run(
    config_path: PathBuf,
    duration: u64,
    simulate_interval: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = PubSubConfiguration::from_file(&config_path)?;
    let store = Arc::new(InMemoryDataStore::new());
    let application = PubSubApplication::builder()
        .application_id("uapubsub-ctl")
        .loopback(LoopbackBus::default())
        .data_store(store.clone())
        .configuration(config)
        .build()?;
    let logger = Arc::new(ReceiveLogger::default());
    application.add_listener(logger.clone());

    println!("OPC UA PubSub v{}", env!("CARGO_PKG_VERSION"));
    println!("=====================================");
    print!("{}", render_tree(application.configurator()));
    println!();
    println!("Press Ctrl+C to stop...");
    println!();

    let simulator = (simulate_interval > 0).then(|| {
        spawn_simulator(
            application.clone(),
            store,
            Duration::from_millis(simulate_interval),
        )
    });
    application.start().await?;

    if duration == 0 {
        tokio::signal::ctrl_c().await?;
    } else {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(duration)) => {}
            result = tokio::signal::ctrl_c() => result?,
        }
    }
    println!("\nShutting down...");

    if let Some(simulator) = simulator {
        simulator.abort();
    }
    if let Err(e) = application.stop().await {
        warn!("Error while stopping: {}", e);
    }

    println!("\nFinal Statistics:");
    for connection in application.connections() {
        for writer_group in connection.publisher_ids() {
            if let Some(stats) = connection.publisher_stats(writer_group) {
                println!(
                    "  Writer group {}: {} cycles, {} messages, {} send failures, {} errors",
                    writer_group,
                    stats.cycles,
                    stats.messages_published,
                    stats.send_failures,
                    stats.cycle_errors
                );
            }
        }
    }
    println!(
        "  Received: {} data messages, {} metadata messages",
        logger.data.load(Ordering::Relaxed),
        logger.meta_data.load(Ordering::Relaxed)
    );
    Ok(())
}
