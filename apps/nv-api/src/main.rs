use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = nv_api::Args::parse();

	nv_api::run(args).await
}
