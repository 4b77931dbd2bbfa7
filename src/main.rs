use clap::Parser;

mod args;
use args::Args;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    let config = match args.to_config() {
        Ok(config) => config,
        Err(e) => {
            ::log::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if args.write_only {
        ::log::info!("Write-only run, skipping the crawl");
    } else {
        println!("Note: crawling requires a WebDriver server (e.g., ChromeDriver).");
        println!(
            "Set WEBDRIVER_URL environment variable if not using {}",
            config.webdriver_url
        );

        match site_harvest::crawl(&config).await {
            Ok(stats) => ::log::info!(
                "Crawling complete - {} pages visited, {} failed",
                stats.pages_visited,
                stats.pages_failed
            ),
            Err(e) => {
                ::log::error!("Crawl failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    match site_harvest::write(&config) {
        Ok(count) => ::log::info!(
            "Wrote {} records to {}",
            count,
            config.output_file_name.display()
        ),
        Err(e) => {
            ::log::error!("Failed to write output: {}", e);
            std::process::exit(1);
        }
    }
}
