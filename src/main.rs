mod api;
mod app;
mod geometry;
mod util;
mod weight;

use anyhow::Context;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Base URL of the graph-data backend.
    #[arg(long, default_value = "http://127.0.0.1:1600")]
    api_url: String,

    /// Entity id seeding the initial subgraph query; repeat for more.
    #[arg(long = "seed", default_value = "uniprot:P05231")]
    seeds: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let api = api::ApiClient::new(&args.api_url)
        .with_context(|| format!("failed to set up a client for {}", args.api_url))?;

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "blobviz",
        options,
        Box::new(move |cc| {
            Ok(Box::new(app::BlobVizApp::new(
                cc,
                api.clone(),
                args.seeds.clone(),
            )))
        }),
    )
    .map_err(|error| anyhow::anyhow!("{error}"))
}
