use clap::{App, AppSettings, Arg, SubCommand};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use dos33::applesoft;
use dos33::disk::{Disk, FileType};
use dos33::extract::{self, ArtifactKind, Extractor};
use dos33::text;

static EXIT_FAILURE: i32 = 1;

/// If a dash is specified for a filename, this indicates that the user wants
/// to write to standard output.
static STDOUT_PSEUDOFILENAME: &str = "-";

fn main() {
    // Parse command-line arguments
    let app = App::new("Apple II DOS 3.3 Disk Image Utility")
        .version("0.1.0")
        .about("List and extract the files on DOS 3.3 disk images.")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("debug")
                .short("v")
                .long("verbose")
                .help("Log disk structure traversal (RUST_LOG overrides)"),
        )
        .arg(Arg::with_name("diskimage").required(true))
        .subcommand(
            SubCommand::with_name("catalog")
                .about("Show a catalog listing")
                .arg(
                    Arg::with_name("verbose")
                        .short("v")
                        .long("verbose")
                        .help("Show track/sector list and catalog slot locations"),
                ),
        )
        .subcommand(
            SubCommand::with_name("extract")
                .about("Extract every file, decoding Applesoft programs and text files.")
                .arg(Arg::with_name("output_dir").required(false)),
        )
        .subcommand(
            SubCommand::with_name("read")
                .about("Read a file from a disk image.")
                .arg(Arg::with_name("source_filename").required(true))
                .arg(Arg::with_name("destination_filename").required(false)),
        )
        .subcommand(
            SubCommand::with_name("list")
                .about("List an Applesoft program or print a text file.")
                .arg(Arg::with_name("filename").required(true)),
        )
        .subcommand(
            SubCommand::with_name("dump")
                .about("Provide a hex dump of a disk image or file.")
                .arg(Arg::with_name("filename").required(false)),
        )
        .subcommand(SubCommand::with_name("vtoc").about("Show the volume table of contents."));

    let matches = app.get_matches();

    init_logging(matches.is_present("debug"));

    let diskimage = matches.value_of("diskimage").unwrap();
    let result = match matches.subcommand() {
        ("catalog", Some(m)) => cmd_catalog(diskimage, m.occurrences_of("verbose")),
        ("extract", Some(m)) => cmd_extract(diskimage, m.value_of("output_dir")),
        ("read", Some(m)) => cmd_read(
            diskimage,
            m.value_of("source_filename").unwrap(),
            m.value_of("destination_filename"),
        ),
        ("list", Some(m)) => cmd_list(diskimage, m.value_of("filename").unwrap()),
        ("dump", Some(m)) => cmd_dump(diskimage, m.value_of("filename")),
        ("vtoc", Some(_)) => cmd_vtoc(diskimage),
        _ => unreachable!(),
    };
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(EXIT_FAILURE);
    }
}

fn init_logging(debug: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        // Standard output may be carrying file contents.
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

/// Open a file for writing
fn open_fs_writer(filename: &str) -> io::Result<Box<dyn Write>> {
    if filename == STDOUT_PSEUDOFILENAME {
        Ok(Box::new(io::stdout()))
    } else {
        Ok(Box::new(fs::File::create(filename)?))
    }
}

fn cmd_catalog(diskimage: &str, verbosity: u64) -> io::Result<()> {
    let disk = Disk::open(diskimage)?;
    println!("{}", disk);
    println!();
    for entry in disk.iter() {
        let entry = entry?;
        if verbosity > 0 {
            println!("{:#}", entry);
        } else {
            println!("{}", entry);
        }
    }
    println!();
    println!("{} sectors free.", disk.volume()?.free_sectors());
    Ok(())
}

/// The default output directory sits next to the disk image.
fn default_output_dir(diskimage: &str) -> PathBuf {
    let path = Path::new(diskimage);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "disk".to_string());
    path.with_file_name(format!("{}_extracted", stem))
}

fn cmd_extract(diskimage: &str, output_dir: Option<&str>) -> io::Result<()> {
    let disk = Disk::open(diskimage)?;
    let output_dir = match output_dir {
        Some(dir) => PathBuf::from(dir),
        None => default_output_dir(diskimage),
    };
    fs::create_dir_all(&output_dir)?;

    println!("{}", disk);
    println!();
    let mut files = 0;
    let mut artifacts = 0;
    let mut incomplete = 0;
    let mut catalog_error = None;
    for result in Extractor::new(&disk) {
        let mut extraction = match result {
            Ok(extraction) => extraction,
            Err(e) => {
                catalog_error = Some(e);
                break;
            }
        };
        println!("{}", extraction.entry);
        // A failed write is recorded with the entry's other problems.
        let written = extraction.write_to(&output_dir);
        for artifact in &extraction.artifacts {
            let path = output_dir.join(&artifact.file_name);
            if artifact.kind != ArtifactKind::Raw && written.contains(&path) {
                println!("    -> {}", artifact.file_name);
            }
        }
        for problem in &extraction.problems {
            println!("    !! {}", problem);
        }
        files += 1;
        artifacts += written.len();
        if !extraction.is_complete() {
            incomplete += 1;
        }
    }

    println!();
    println!(
        "Extracted {} files ({} artifacts) to {}",
        files,
        artifacts,
        output_dir.display()
    );
    if incomplete > 0 {
        println!("{} files could not be fully extracted.", incomplete);
    }
    match catalog_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn cmd_read(
    diskimage: &str,
    source_filename: &str,
    destination_filename: Option<&str>,
) -> io::Result<()> {
    let disk = Disk::open(diskimage)?;
    let entry = disk.find_entry(source_filename)?;
    let destination_filename = match destination_filename {
        Some(filename) => filename.to_string(),
        None => extract::safe_filename(source_filename),
    };
    let mut reader = disk.reader(&entry);
    let mut writer = open_fs_writer(&destination_filename)?;
    io::copy(&mut reader, &mut writer)?;
    writer.flush()?;
    Ok(())
}

fn cmd_list(diskimage: &str, filename: &str) -> io::Result<()> {
    let disk = Disk::open(diskimage)?;
    let entry = disk.find_entry(filename)?;
    let contents = disk.read_file(&entry)?;
    match entry.file_type {
        FileType::Applesoft => {
            let program = applesoft::detokenize(&contents)?;
            for line in &program.lines {
                println!("{}", line);
            }
        }
        FileType::Text => {
            // Apple text lines end in carriage returns.
            for line in text::normalize_text(&contents).split_terminator('\r') {
                println!("{}", line);
            }
        }
        file_type => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "\"{}\" is a type {} file; only A and T files can be listed",
                    entry.filename, file_type
                ),
            ));
        }
    }
    Ok(())
}

fn cmd_dump(diskimage: &str, filename: Option<&str>) -> io::Result<()> {
    let disk = Disk::open(diskimage)?;
    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    match filename {
        Some(filename) => {
            let entry = disk.find_entry(filename)?;
            disk.dump_file(&entry, &mut stdout)?;
        }
        None => disk.dump(&mut stdout)?,
    }
    Ok(())
}

fn cmd_vtoc(diskimage: &str) -> io::Result<()> {
    let disk = Disk::open(diskimage)?;
    print!("{:?}", disk.volume()?);
    Ok(())
}
