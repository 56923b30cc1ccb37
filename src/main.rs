use std::collections::HashMap;

use bitfont::filters::FontFilter;
use clap::{CommandFactory, FromArgMatches, Parser};

/// Inspect and transform bitmap fonts
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input font file
    font_path: String,

    /// Path to the output font file
    output: Option<String>,

    /// List the font's properties, including derived ones
    #[arg(short, long)]
    info: bool,

    #[command(flatten)]
    verbosity: clap_verbosity_flag::Verbosity,
}

fn print_info(font: &bitfont::Font) {
    for (key, value) in font.properties() {
        let comment = font.get_comment(&key);
        if !comment.is_empty() {
            for line in comment.lines() {
                println!("# {}", line);
            }
        }
        println!("{}: {}", key, value);
    }
    println!("glyphs: {}", font.glyphs().len());
}

fn main() {
    // Extend with the font filter arguments
    let command = bitfont::filters::filter_group(Args::command());
    let matches = command.get_matches();
    let args = Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());
    env_logger::Builder::new()
        .filter_level(args.verbosity.into())
        .init();

    // Clap stores --foo 1 --bar 2 --foo 3 as "foo": ["1", "3"], "bar": ["2"],
    // losing the original order, but we can regain that order by looking at
    // the raw occurrences of the "filters" arg group.
    let mut counter = HashMap::new();
    let mut filters: Vec<Box<dyn FontFilter>> = vec![];
    for filter in matches.get_raw("filters").into_iter().flatten() {
        let name = filter.to_string_lossy().into_owned();
        let count = counter.entry(name.clone()).or_insert(0);
        // Get the count'th occurrence of this filter
        let value = matches
            .get_raw_occurrences(&name)
            .and_then(|mut occurrences| occurrences.nth(*count))
            .map(|values| {
                values
                    .map(|v| v.to_string_lossy().into_owned())
                    .collect::<String>()
            })
            .unwrap_or_default();
        *count += 1;
        match bitfont::filters::cli_to_filter(&name, &value) {
            Ok(filter) => filters.push(filter),
            Err(e) => {
                log::error!("{}", e);
                std::process::exit(1);
            }
        }
    }

    log::info!("Loading {}", args.font_path);
    let mut font = bitfont::load(&args.font_path).expect("Failed to load font");
    if !filters.is_empty() {
        log::info!("Applying filters...");
        let before_filters = std::time::Instant::now();
        for filter in filters {
            filter
                .apply(&mut font)
                .expect("Failed to apply font filter");
        }
        log::info!("Applied filters in {:.2?}", before_filters.elapsed());
    }

    if args.info || args.output.is_none() {
        print_info(&font);
    }
    if let Some(output) = args.output {
        log::info!("Saving {}", output);
        font.save(output).expect("Failed to save font");
    }
}
