use anyhow::Result;
use pipeprobe::OutputFormat;
use serde_json::json;

pub async fn handle_version(format: OutputFormat) -> Result<()> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const NAME: &str = env!("CARGO_PKG_NAME");
    const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({ "name": NAME, "version": VERSION, "authors": AUTHORS })
        ),
        OutputFormat::Simple => {
            println!("{} v{}", NAME, VERSION);
            println!("By: {}", AUTHORS);
        }
    }
    Ok(())
}
