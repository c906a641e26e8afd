//! MobSF client command line interface.

#![forbid(anonymous_parameters, unsafe_code)]
#![deny(unused_extern_crates)]
#![warn(missing_docs, unused_results)]

use clap::ArgMatches;
use colored::Colorize;
use failure::{err_msg, Error, ResultExt};
use log::{debug, info};
use mobsf_client::{
    cli::generate_cli,
    dynamic_analysis::{
        ActivityTest, Device, DynamicSourceKind, FridaAction, InstrumentationRequest, ProxyAction,
        RootCaAction,
    },
    initialize_config, initialize_logger, print_error, print_json,
    static_analysis::{FindingType, SourceKind, SuppressionKind, SuppressionRule},
    Client, Config, DynamicAnalyzer, Hash, Kind, StaticAnalyzer,
};
use std::{fs, path::Path, process};

#[tokio::main]
async fn main() {
    let cli = generate_cli().get_matches();
    let config = match initialize_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            print_error(format!("error loading the configuration: {}", e));
            process::exit(2);
        }
    };
    if !config.is_quiet() {
        initialize_logger(config.is_verbose());
    }

    if let Err(e) = run(&config, &cli).await {
        print_error(e.to_string());
        for cause in e.iter_causes() {
            print_error(format!("caused by: {}", cause));
        }
        if config.is_verbose() {
            print_error(format!("{}", e.backtrace()));
        } else if !config.is_quiet() {
            println!(
                "If you need more information, try to run the program again with the {} flag.",
                "-v".bold()
            );
        }
        let code = match e.downcast_ref::<Kind>() {
            Some(Kind::Config { .. }) => 2,
            _ => 1,
        };
        process::exit(code);
    }
}

async fn run(config: &Config, cli: &ArgMatches<'_>) -> Result<(), Error> {
    let errors = config.errors();
    if !errors.is_empty() {
        for error in &errors {
            print_error(error);
        }
        return Err(Kind::config("configuration errors were found").into());
    }
    debug!("using configuration {:?}", config);

    let client = Client::new(config)?;
    match cli.subcommand() {
        ("apps", Some(_)) => print_json(&client.dynamic_analyzer().apps().await?),
        ("dynamic", Some(matches)) => run_dynamic(&client.dynamic_analyzer(), matches).await,
        ("frida", Some(matches)) => run_frida(&client.dynamic_analyzer(), matches).await,
        (name, Some(matches)) => {
            run_static(&client.static_analyzer(), name, matches, config).await
        }
        _ => Err(err_msg("no command was given")),
    }
}

async fn run_static(
    analyzer: &StaticAnalyzer,
    name: &str,
    matches: &ArgMatches<'_>,
    config: &Config,
) -> Result<(), Error> {
    match name {
        "upload" => {
            let path = Path::new(required(matches, "package")?);
            let bytes = fs::read(path)
                .context(format!("could not read the package `{}`", path.display()))?;
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| err_msg(format!("`{}` is not a file", path.display())))?;

            let upload = analyzer.upload(bytes, file_name).await?;
            if matches.is_present("scan") {
                if !config.is_quiet() {
                    info!("scanning {}, this can take a while", upload.hash());
                }
                print_json(&analyzer.scan(upload.hash(), false).await?)
            } else {
                print_json(&upload)
            }
        }
        "scan" => {
            let record = analyzer
                .scan(&hash(matches)?, matches.is_present("rescan"))
                .await?;
            print_json(&record)
        }
        "logs" => print_json(&analyzer.scan_logs(&hash(matches)?).await?),
        "search" => print_json(&analyzer.search(required(matches, "query")?).await?),
        "scans" => {
            let page = number(matches, "page")?;
            let page_size = number(matches, "page-size")?;
            print_json(&analyzer.recent_scans(page, page_size).await?)
        }
        "tasks" => print_json(&analyzer.scan_tasks().await?),
        "scorecard" => print_json(&analyzer.scorecard(&hash(matches)?).await?),
        "report" => {
            let hash = hash(matches)?;
            if let Some(path) = matches.value_of("pdf") {
                let pdf = analyzer.download_pdf_report(&hash).await?;
                fs::write(path, pdf.as_bytes())
                    .context(format!("could not write the report to `{}`", path))?;
                info!("PDF report of {} saved to `{}`", hash, path);
                Ok(())
            } else {
                print_json(&analyzer.json_report(&hash).await?)
            }
        }
        "source" => {
            let kind: SourceKind = required(matches, "type")?.parse()?;
            let file = analyzer
                .view_source_file(&hash(matches)?, required(matches, "file")?, kind)
                .await?;
            print_json(&file)
        }
        "delete" => print_json(&analyzer.delete_scan(&hash(matches)?).await?),
        "suppress" => {
            let kind = if matches.is_present("files") {
                SuppressionKind::File
            } else {
                SuppressionKind::Rule
            };
            print_json(&analyzer.suppress(&suppression(matches, kind)?).await?)
        }
        "suppressions" => print_json(&analyzer.list_suppressions(&hash(matches)?).await?),
        "unsuppress" => {
            let kind: SuppressionKind = required(matches, "kind")?.parse()?;
            print_json(
                &analyzer
                    .remove_suppression(&suppression(matches, kind)?)
                    .await?,
            )
        }
        other => Err(err_msg(format!("unknown command `{}`", other))),
    }
}

async fn run_dynamic(analyzer: &DynamicAnalyzer, cli: &ArgMatches<'_>) -> Result<(), Error> {
    match cli.subcommand() {
        ("start", Some(matches)) => {
            let install = !matches.is_present("no-install");
            let re_install = !matches.is_present("keep");
            print_json(
                &analyzer
                    .start_analysis(&hash(matches)?, re_install, install)
                    .await?,
            )
        }
        ("stop", Some(matches)) => print_json(&analyzer.stop_analysis(&hash(matches)?).await?),
        ("report", Some(matches)) => print_json(&analyzer.report(&hash(matches)?).await?),
        ("logcat", Some(matches)) => {
            print_json(&analyzer.logcat(required(matches, "package")?).await?)
        }
        ("mobsfy", Some(matches)) => {
            print_json(&analyzer.mobsfy(required(matches, "identifier")?).await?)
        }
        ("root-ca", Some(matches)) => {
            let action: RootCaAction = required(matches, "action")?.parse()?;
            print_json(&analyzer.root_ca(action).await?)
        }
        ("proxy", Some(matches)) => {
            let action: ProxyAction = required(matches, "action")?.parse()?;
            print_json(&analyzer.global_proxy(action).await?)
        }
        ("activity", Some(matches)) => {
            let test: ActivityTest = required(matches, "test")?.parse()?;
            print_json(&analyzer.activity_test(&hash(matches)?, test).await?)
        }
        ("tls", Some(matches)) => print_json(&analyzer.tls_tests(&hash(matches)?).await?),
        ("source", Some(matches)) => {
            let kind: DynamicSourceKind = required(matches, "type")?.parse()?;
            let file = analyzer
                .view_source(&hash(matches)?, required(matches, "file")?, kind)
                .await?;
            print_json(&file)
        }
        (other, _) => Err(err_msg(format!("unknown dynamic command `{}`", other))),
    }
}

async fn run_frida(analyzer: &DynamicAnalyzer, cli: &ArgMatches<'_>) -> Result<(), Error> {
    let frida = analyzer.instrumentation();
    match cli.subcommand() {
        ("scripts", Some(matches)) => {
            let device: Device = required(matches, "device")?.parse()?;
            print_json(&frida.list_scripts(device).await?)
        }
        ("script", Some(matches)) => {
            let device: Device = required(matches, "device")?.parse()?;
            print_json(&frida.get_script(required(matches, "name")?, device).await?)
        }
        ("instrument", Some(matches)) => {
            let request = instrumentation_request(matches)?;
            print_json(&frida.instrument(&request).await?)
        }
        ("monitor", Some(matches)) => print_json(&frida.api_monitor(&hash(matches)?).await?),
        ("logs", Some(matches)) => print_json(&frida.logs(&hash(matches)?).await?),
        ("deps", Some(matches)) => {
            print_json(&frida.runtime_dependencies(&hash(matches)?).await?)
        }
        (other, _) => Err(err_msg(format!("unknown frida command `{}`", other))),
    }
}

fn instrumentation_request(matches: &ArgMatches<'_>) -> Result<InstrumentationRequest, Error> {
    let action: FridaAction = required(matches, "action")?.parse()?;
    let mut request = InstrumentationRequest::new(hash(matches)?)
        .action(action)
        .default_hooks(matches.values_of("hook").into_iter().flatten())
        .auxiliary_hooks(matches.values_of("aux").into_iter().flatten());

    if let Some(path) = matches.value_of("code") {
        let code = fs::read_to_string(path)
            .context(format!("could not read the Frida code from `{}`", path))?;
        request = request.code(code);
    }
    if let Some(class_name) = matches.value_of("class-name") {
        request = request.class_name(class_name);
    }
    if let Some(pattern) = matches.value_of("class-search") {
        request = request.class_search(pattern);
    }
    if let Some(class_name) = matches.value_of("class-trace") {
        request = request.class_trace(class_name);
    }
    if matches.is_present("pid") {
        request = request.pid(number(matches, "pid")?);
    }
    if let Some(package_name) = matches.value_of("new-package") {
        request = request.new_package(package_name);
    }
    Ok(request)
}

fn required<'a>(matches: &'a ArgMatches<'_>, name: &str) -> Result<&'a str, Error> {
    matches
        .value_of(name)
        .ok_or_else(|| err_msg(format!("missing argument `{}`", name)))
}

fn hash(matches: &ArgMatches<'_>) -> Result<Hash, Error> {
    Ok(Hash::new(required(matches, "hash")?))
}

fn number(matches: &ArgMatches<'_>, name: &str) -> Result<u32, Error> {
    let value = required(matches, name)?;
    let number = value
        .parse::<u32>()
        .context(format!("`{}` must be a positive number, got `{}`", name, value))?;
    Ok(number)
}

fn suppression(matches: &ArgMatches<'_>, kind: SuppressionKind) -> Result<SuppressionRule, Error> {
    let finding_type: FindingType = required(matches, "type")?.parse()?;
    Ok(SuppressionRule::new(
        hash(matches)?,
        kind,
        finding_type,
        required(matches, "rule")?,
    ))
}
