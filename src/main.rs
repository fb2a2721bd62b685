use clap::Parser;

use log::{error, info};

use voc2yolo::{
    partition_dataset, process_annotations, visualize_annotations, ClassVocabulary, Cli, Command,
    ConvertArgs,
};

fn run_convert(args: &ConvertArgs) -> voc2yolo::Result<()> {
    let vocabulary = ClassVocabulary::from_label_list(&args.label_list);
    info!("Class vocabulary: {:?}", vocabulary.labels());

    let stats = process_annotations(&args.annotations_dir(), &args.output_dir(), &vocabulary)?;
    stats.print_summary();
    info!("Annotation conversion to YOLO format is complete.");
    Ok(())
}

fn main() {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Convert(args) => run_convert(args),
        Command::Partition(args) => partition_dataset(args).map(|_| ()),
        Command::Visualize(args) => visualize_annotations(args).map(|_| ()),
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}
