use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = nv_worker::Args::parse();

	nv_worker::run(args).await
}
