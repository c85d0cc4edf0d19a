use clap::{arg, crate_version, Command};

const RCH: &str = "unreachable was reached";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let long_help = "Examples:
---------
Compress:   `zlibctl deflate -i my_file -o my_file.zz`
Decompress: `zlibctl inflate -i my_file.zz -o my_file`";

    let mut main_cmd = Command::new("zlibctl")
        .about("Compress and decompress zlib/DEFLATE streams")
        .after_long_help(long_help)
        .version(crate_version!());

    main_cmd = main_cmd.subcommand(
        Command::new("deflate")
            .arg(arg!(-i --input <PATH> "input path").required(true))
            .arg(arg!(-o --output <PATH> "output path").required(true))
            .about("compress a file into a zlib stream"),
    );

    main_cmd = main_cmd.subcommand(
        Command::new("inflate")
            .arg(arg!(-i --input <PATH> "input path").required(true))
            .arg(arg!(-o --output <PATH> "output path").required(true))
            .about("decompress a zlib stream"),
    );

    let matches = main_cmd.get_matches();

    if let Some(cmd) = matches.subcommand_matches("deflate") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = cmd.get_one::<String>("output").expect(RCH);
        let mut src = std::fs::File::open(path_in)?;
        let mut dest = std::fs::File::create(path_out)?;
        zlibcodec::deflate(&mut src, &mut dest)?;
    }

    if let Some(cmd) = matches.subcommand_matches("inflate") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = cmd.get_one::<String>("output").expect(RCH);
        let mut src = std::fs::File::open(path_in)?;
        let mut dest = std::fs::File::create(path_out)?;
        zlibcodec::inflate(&mut src, &mut dest)?;
    }

    Ok(())
}
