use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SimArgs {
    pub(crate) world: Option<PathBuf>,
    pub(crate) tileset: Option<PathBuf>,
    pub(crate) first_gid: Option<u32>,
    pub(crate) config: Option<PathBuf>,
    pub(crate) ticks: Option<u64>,
    pub(crate) report: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    Run(SimArgs),
    Help,
}

pub(crate) fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut parsed = SimArgs::default();
    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "--world" => {
                parsed.world = Some(PathBuf::from(value_for(args, index, "--world")?));
                index += 2;
            }
            "--tileset" => {
                parsed.tileset = Some(PathBuf::from(value_for(args, index, "--tileset")?));
                index += 2;
            }
            "--firstgid" => {
                let value = value_for(args, index, "--firstgid")?;
                let first_gid = value
                    .parse::<u32>()
                    .map_err(|_| format!("invalid --firstgid value '{value}' (expected u32)"))?;
                if first_gid == 0 {
                    return Err("--firstgid must be at least 1".to_string());
                }
                parsed.first_gid = Some(first_gid);
                index += 2;
            }
            "--config" => {
                parsed.config = Some(PathBuf::from(value_for(args, index, "--config")?));
                index += 2;
            }
            "--ticks" => {
                let value = value_for(args, index, "--ticks")?;
                parsed.ticks = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| format!("invalid --ticks value '{value}' (expected u64)"))?,
                );
                index += 2;
            }
            "--report" => {
                parsed.report = Some(PathBuf::from(value_for(args, index, "--report")?));
                index += 2;
            }
            other => return Err(format!("unknown argument '{other}'\n\n{}", usage_text())),
        }
    }

    if parsed.first_gid.is_some() && parsed.tileset.is_none() {
        return Err("--firstgid requires --tileset".to_string());
    }
    Ok(Command::Run(parsed))
}

fn value_for<'a>(args: &'a [String], index: usize, flag: &str) -> Result<&'a str, String> {
    args.get(index + 1)
        .map(String::as_str)
        .ok_or_else(|| format!("missing value for {flag}"))
}

pub(crate) fn usage_text() -> String {
    [
        "Usage: realm_sim [options]",
        "",
        "Options:",
        "  --world <path>      Tiled infinite-map JSON to load (default: built-in demo world)",
        "  --tileset <path>    Tiled .tsx tileset with tile properties",
        "  --firstgid <n>      First global tile id of the tileset (default: 1)",
        "  --config <path>     Engine config JSON",
        "  --ticks <n>         Number of simulation ticks to run",
        "  --report <path>     Write a JSON summary of the run",
        "  -h, --help          Show this help",
    ]
    .join("\n")
}
