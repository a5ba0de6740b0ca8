// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 robotat.dev

//! robotat-mocap-pub - Publish synthetic rigid-body MOCAP packets
//!
//! Stands in for the OptiTrack-side publisher when no capture system is
//! available: moves a rigid body on a circle and publishes sealed MOCAP
//! packets at a fixed rate. Useful for soaking the bridge and the viewer
//! frontend.
//!
//! ```bash
//! # 10 Hz circle on the default mocap topic
//! robotat-mocap-pub --broker-host 192.168.50.200 --broker-port 1880
//!
//! # Two bodies' worth of traffic, 50 packets each
//! robotat-mocap-pub --rigid-body 3 --count 50
//! ```

use clap::Parser;
use rumqttc::{AsyncClient, Event, MqttOptions, QoS};
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use robotat_bridge::packet::{Packet, Pose};

/// Publish synthetic rigid-body MOCAP packets
#[derive(Parser, Debug)]
#[command(name = "robotat-mocap-pub")]
#[command(about = "Publish synthetic rigid-body MOCAP packets to the Robotat broker")]
#[command(version)]
struct Args {
    /// MQTT broker host
    #[arg(long, default_value = "localhost")]
    broker_host: String,

    /// MQTT broker port
    #[arg(long, default_value = "1883")]
    broker_port: u16,

    /// Topic to publish on
    #[arg(short, long, default_value = "mocap/all")]
    topic: String,

    /// Source ID stamped into packets (0 = ROBOTAT_SERVER)
    #[arg(short, long, default_value = "0")]
    source: i64,

    /// Rigid body ID (becomes the packet `pid`)
    #[arg(short, long, default_value = "1")]
    rigid_body: i64,

    /// Publish rate in Hz
    #[arg(long, default_value = "10.0")]
    rate: f64,

    /// Circle radius in meters
    #[arg(long, default_value = "1.0")]
    radius: f64,

    /// Number of packets to publish (0 = until Ctrl+C)
    #[arg(short = 'n', long, default_value = "0")]
    count: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if args.rate <= 0.0 {
        return Err("--rate must be positive".into());
    }

    info!(
        "publishing to '{}' on {}:{} at {} Hz",
        args.topic, args.broker_host, args.broker_port, args.rate
    );

    let mut options = MqttOptions::new(
        format!("robotat-mocap-pub-{}", args.rigid_body),
        args.broker_host.clone(),
        args.broker_port,
    );
    options.set_keep_alive(Duration::from_secs(60));
    let (client, mut event_loop) = AsyncClient::new(options, 64);

    // Keep the connection alive; the publisher itself is fire-and-forget.
    tokio::spawn(async move {
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(frame)) => debug!("broker frame: {:?}", frame),
                Ok(_) => {}
                Err(e) => {
                    warn!("broker connection error: {}; retrying", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    });

    let period = Duration::from_secs_f64(1.0 / args.rate);
    let mut ticker = tokio::time::interval(period);
    let mut published: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let pts = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
                let pose = circle_pose(args.radius, pts);
                let packet = Packet::mocap(args.source, args.rigid_body, pose, pts)?.seal()?;
                let payload = serde_json::to_string(&packet)?;

                if let Err(e) = client.try_publish(&args.topic, QoS::AtMostOnce, false, payload) {
                    warn!("publish failed: {}", e);
                } else {
                    published += 1;
                    debug!("published packet {} (pts={})", published, pts);
                }

                if args.count > 0 && published >= args.count {
                    info!("published {} packets, done", published);
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted after {} packets", published);
                return Ok(());
            }
        }
    }
}

/// Constant-speed circle in the XY plane, identity orientation.
fn circle_pose(radius: f64, t: f64) -> Pose {
    let angle = t % (2.0 * std::f64::consts::PI);
    Pose::new(
        [radius * angle.cos(), radius * angle.sin(), 0.0],
        [0.0, 0.0, 0.0, 1.0],
    )
}
