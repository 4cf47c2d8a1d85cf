use std::io::{self, IsTerminal, Read};
use std::path::Path;

use anyhow::{Result, anyhow};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "quote-canvas",
    version,
    about = "Fit a quote over a background image and export or upload the result"
)]
struct Cli {
    /// Background image (png/jpeg/webp/gif/bmp)
    #[arg(short = 'b', long = "background")]
    background: Option<String>,

    /// Quote text (reads stdin when omitted)
    #[arg(short = 'q', long = "quote")]
    quote: Option<String>,

    /// Output file (default: quote.<ext>)
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Output mime type: image/jpeg or image/png (jpg/png also accepted)
    #[arg(short = 'M', long = "output-mime")]
    output_mime: Option<String>,

    /// Font family (must be one of --show-fonts)
    #[arg(short = 'f', long = "font")]
    font: Option<String>,

    /// Base font size in px (clamped to 10-100)
    #[arg(short = 's', long = "size")]
    size: Option<u32>,

    /// Text color as #rgb or #rrggbb
    #[arg(short = 'c', long = "color")]
    color: Option<String>,

    /// Print the fitted layout as JSON instead of rendering
    #[arg(long = "layout")]
    layout: bool,

    /// Upload the rendered image and print its URL
    #[arg(short = 'u', long = "upload")]
    upload: bool,

    /// Show configured font families and exit
    #[arg(long = "show-fonts")]
    show_fonts: bool,

    /// Show the configured color palette and exit
    #[arg(long = "show-colors")]
    show_colors: bool,

    /// Run the HTTP server (default address from settings [server])
    #[arg(long = "serve", num_args = 0..=1, default_missing_value = "")]
    serve: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    quote_canvas::logging::init(cli.verbose)?;

    if let Some(addr) = cli.serve.as_deref() {
        let settings =
            quote_canvas::settings::load_settings(cli.read_settings.as_deref().map(Path::new))?;
        let addr = if addr.trim().is_empty() {
            settings.server_addr.clone()
        } else {
            addr.trim().to_string()
        };
        eprintln!("quote-canvas listening on http://{}", addr);
        return quote_canvas::server::run_server(settings, addr).await;
    }

    let needs_input = !(cli.show_fonts || cli.show_colors);
    let input = if !needs_input {
        None
    } else if let Some(quote) = cli.quote.clone() {
        Some(quote)
    } else if io::stdin().is_terminal() {
        return Err(anyhow!("no quote given; pass --quote or pipe text on stdin"));
    } else {
        let mut buffer = Vec::new();
        io::stdin().read_to_end(&mut buffer)?;
        Some(String::from_utf8(buffer).map_err(|_| anyhow!("stdin must be UTF-8 text"))?)
    };

    let output = quote_canvas::run(
        quote_canvas::Config {
            background: cli.background,
            output: cli.output,
            output_mime: cli.output_mime,
            font_family: cli.font,
            font_size: cli.size,
            color: cli.color,
            settings_path: cli.read_settings,
            layout_only: cli.layout,
            upload: cli.upload,
            show_fonts: cli.show_fonts,
            show_colors: cli.show_colors,
        },
        input,
    )
    .await?;

    println!("{}", output);
    Ok(())
}
