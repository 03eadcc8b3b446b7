#![deny(unsafe_code)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use simple_logger::SimpleLogger;
use structopt::StructOpt;

use mqtt_recorder::config::PluginConfig;
use mqtt_recorder::netif;
use mqtt_recorder::server::Broker;
use mqtt_recorder::store::RecordStore;

#[derive(Debug, StructOpt)]
#[structopt(name = "mqtt-recorderd", about = "MQTT broker service recording published messages")]
struct Options {
    /// Listen address; discovered from the wireless interface when omitted
    #[structopt(long)]
    addr: Option<IpAddr>,
    /// MQTT listener port
    #[structopt(long, default_value = "1883")]
    port: u16,
    /// Log level (off, error, warn, info, debug, trace)
    #[structopt(long, default_value = "info")]
    log_level: log::LevelFilter,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = Options::from_args();
    SimpleLogger::new().with_level(opts.log_level).init()?;

    let ip = opts.addr.or_else(|| netif::wireless_ipv4().map(IpAddr::V4)).unwrap_or_else(|| {
        log::warn!("no wireless IPv4 interface found, listening on all interfaces");
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    });
    log::info!("Host IP Address: {ip}");
    log::info!("Port: {}", opts.port);

    let broker = Broker::new();
    if let Err(e) = broker.start(SocketAddr::new(ip, opts.port)).await {
        log::error!("An error occurred: {e}");
        let store = RecordStore::new(&PluginConfig::default());
        if let Err(we) = store.append_event(&format!("An error occurred: {e}")).await {
            log::warn!("failed to append event line, {we:?}");
        }
        std::process::exit(1);
    }

    log::info!("MQTT broker started. Press Ctrl+C to exit...");
    tokio::signal::ctrl_c().await?;
    broker.stop().await;
    Ok(())
}
