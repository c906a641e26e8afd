//! Command line interface definition.
//!
//! This module is also compiled by the build script to generate the shell completion
//! scripts, so it can only depend on `clap`.

use clap::{crate_version, App, AppSettings, Arg, SubCommand};

/// Generates the command line interface.
pub fn generate_cli() -> App<'static, 'static> {
    App::new("MobSF client")
        .version(crate_version!())
        .about("Drives static and dynamic mobile application analysis on a MobSF server.")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .setting(AppSettings::VersionlessSubcommands)
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .global(true)
                .conflicts_with("quiet")
                .help("If you'd like the client to talk more than it should."),
        )
        .arg(
            Arg::with_name("quiet")
                .short("q")
                .long("quiet")
                .global(true)
                .conflicts_with("verbose")
                .help("If you'd like a zen client. Only results and errors are printed."),
        )
        .arg(
            Arg::with_name("server")
                .long("server")
                .value_name("URL")
                .takes_value(true)
                .global(true)
                .help("Base address of the MobSF server."),
        )
        .arg(
            Arg::with_name("api-key")
                .long("api-key")
                .value_name("KEY")
                .takes_value(true)
                .global(true)
                .help("API key of the MobSF server. Prefer the MOBSF_API_KEY variable."),
        )
        .arg(
            Arg::with_name("timeout")
                .long("timeout")
                .value_name("SECONDS")
                .takes_value(true)
                .global(true)
                .help("Request timeout in seconds, 0 to disable it."),
        )
        .subcommands(static_subcommands())
        .subcommand(apps_subcommand())
        .subcommand(dynamic_subcommand())
        .subcommand(frida_subcommand())
}

fn hash_arg() -> Arg<'static, 'static> {
    Arg::with_name("hash")
        .value_name("HASH")
        .required(true)
        .help("Hash of the uploaded application.")
}

fn static_subcommands() -> Vec<App<'static, 'static>> {
    vec![
        SubCommand::with_name("upload")
            .about("Uploads an apk, xapk, apks, zip, ipa or appx package.")
            .arg(
                Arg::with_name("package")
                    .value_name("FILE")
                    .required(true)
                    .help("Package to upload."),
            )
            .arg(
                Arg::with_name("scan")
                    .long("scan")
                    .help("Starts the static scan once the upload finishes."),
            ),
        SubCommand::with_name("scan")
            .about("Runs the static scan of an uploaded package.")
            .arg(hash_arg())
            .arg(
                Arg::with_name("rescan")
                    .long("rescan")
                    .help("Runs the analysis again, overwriting the stored findings."),
            ),
        SubCommand::with_name("logs")
            .about("Shows the static scan logs.")
            .arg(hash_arg()),
        SubCommand::with_name("search")
            .about("Searches scans by hash, application name, package or file name.")
            .arg(
                Arg::with_name("query")
                    .value_name("QUERY")
                    .required(true)
                    .help("Search term."),
            ),
        SubCommand::with_name("scans")
            .about("Lists the recent scans.")
            .arg(
                Arg::with_name("page")
                    .long("page")
                    .value_name("PAGE")
                    .takes_value(true)
                    .default_value("1")
                    .help("Page to show, starting at 1."),
            )
            .arg(
                Arg::with_name("page-size")
                    .long("page-size")
                    .value_name("SIZE")
                    .takes_value(true)
                    .default_value("10")
                    .help("Scans per page."),
            ),
        SubCommand::with_name("tasks").about("Lists the queued scan tasks."),
        SubCommand::with_name("scorecard")
            .about("Shows the security scorecard of a scan.")
            .arg(hash_arg()),
        SubCommand::with_name("report")
            .about("Shows the JSON report of a scan, or stores its PDF.")
            .arg(hash_arg())
            .arg(
                Arg::with_name("pdf")
                    .long("pdf")
                    .value_name("FILE")
                    .takes_value(true)
                    .help("Downloads the PDF report to the given file."),
            ),
        SubCommand::with_name("source")
            .about("Shows a source file of a scanned package.")
            .arg(hash_arg())
            .arg(
                Arg::with_name("file")
                    .value_name("PATH")
                    .required(true)
                    .help("Relative path of the file."),
            )
            .arg(
                Arg::with_name("type")
                    .long("type")
                    .value_name("TYPE")
                    .takes_value(true)
                    .possible_values(&["apk", "ipa", "studio", "eclipse", "ios"])
                    .default_value("apk")
                    .help("Kind of the scanned package."),
            ),
        SubCommand::with_name("delete")
            .about("Deletes a scan and its suppression rules.")
            .arg(hash_arg()),
        SubCommand::with_name("suppress")
            .about("Suppresses the findings of a rule.")
            .arg(hash_arg())
            .arg(finding_type_arg())
            .arg(rule_arg())
            .arg(
                Arg::with_name("files")
                    .long("files")
                    .help("Suppresses the rule only in the files it was found in."),
            ),
        SubCommand::with_name("suppressions")
            .about("Lists the suppression rules of a scan.")
            .arg(hash_arg()),
        SubCommand::with_name("unsuppress")
            .about("Deletes a suppression rule.")
            .arg(hash_arg())
            .arg(finding_type_arg())
            .arg(rule_arg())
            .arg(
                Arg::with_name("kind")
                    .long("kind")
                    .value_name("KIND")
                    .takes_value(true)
                    .possible_values(&["rule", "file"])
                    .default_value("rule")
                    .help("Kind of the suppression to delete."),
            ),
    ]
}

fn finding_type_arg() -> Arg<'static, 'static> {
    Arg::with_name("type")
        .long("type")
        .value_name("TYPE")
        .takes_value(true)
        .possible_values(&["code", "manifest"])
        .default_value("code")
        .help("Kind of finding.")
}

fn rule_arg() -> Arg<'static, 'static> {
    Arg::with_name("rule")
        .value_name("RULE")
        .required(true)
        .help("Rule identifier.")
}

fn apps_subcommand() -> App<'static, 'static> {
    SubCommand::with_name("apps").about("Lists the applications available for dynamic analysis.")
}

fn dynamic_subcommand() -> App<'static, 'static> {
    SubCommand::with_name("dynamic")
        .about("Dynamic analysis on a device or emulator.")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("start")
                .about("Starts the dynamic analysis of an application.")
                .arg(hash_arg())
                .arg(
                    Arg::with_name("no-install")
                        .long("no-install")
                        .help("Attaches to the application already installed on the device."),
                )
                .arg(
                    Arg::with_name("keep")
                        .long("keep")
                        .help("Does not reinstall the application if it is already present."),
                ),
        )
        .subcommand(
            SubCommand::with_name("stop")
                .about("Stops the dynamic analysis of an application.")
                .arg(hash_arg()),
        )
        .subcommand(
            SubCommand::with_name("report")
                .about("Shows the dynamic analysis report.")
                .arg(hash_arg()),
        )
        .subcommand(
            SubCommand::with_name("logcat")
                .about("Shows the logcat of an application package.")
                .arg(
                    Arg::with_name("package")
                        .value_name("PACKAGE")
                        .required(true)
                        .help("Package name."),
                ),
        )
        .subcommand(
            SubCommand::with_name("mobsfy")
                .about("Prepares a device or emulator for dynamic analysis.")
                .arg(
                    Arg::with_name("identifier")
                        .value_name("IDENTIFIER")
                        .required(true)
                        .help("Device identifier, such as `192.168.56.101:5555`."),
                ),
        )
        .subcommand(
            SubCommand::with_name("root-ca")
                .about("Installs or removes the interception root CA.")
                .arg(
                    Arg::with_name("action")
                        .value_name("ACTION")
                        .required(true)
                        .possible_values(&["install", "remove"]),
                ),
        )
        .subcommand(
            SubCommand::with_name("proxy")
                .about("Sets or unsets the global HTTP proxy of the device.")
                .arg(
                    Arg::with_name("action")
                        .value_name("ACTION")
                        .required(true)
                        .possible_values(&["set", "unset"]),
                ),
        )
        .subcommand(
            SubCommand::with_name("activity")
                .about("Runs an activity tester.")
                .arg(hash_arg())
                .arg(
                    Arg::with_name("test")
                        .value_name("TEST")
                        .required(true)
                        .possible_values(&["exported", "activity"]),
                ),
        )
        .subcommand(
            SubCommand::with_name("tls")
                .about("Runs the TLS/SSL security tests.")
                .arg(hash_arg()),
        )
        .subcommand(
            SubCommand::with_name("source")
                .about("Shows a file captured during dynamic analysis.")
                .arg(hash_arg())
                .arg(
                    Arg::with_name("file")
                        .value_name("PATH")
                        .required(true)
                        .help("Path of the captured file."),
                )
                .arg(
                    Arg::with_name("type")
                        .long("type")
                        .value_name("TYPE")
                        .takes_value(true)
                        .possible_values(&["xml", "db", "others"])
                        .default_value("others")
                        .help("Kind of the captured file."),
                ),
        )
}

fn device_arg() -> Arg<'static, 'static> {
    Arg::with_name("device")
        .long("device")
        .value_name("DEVICE")
        .takes_value(true)
        .possible_values(&["android", "ios"])
        .default_value("android")
        .help("Target platform of the scripts.")
}

fn frida_subcommand() -> App<'static, 'static> {
    SubCommand::with_name("frida")
        .about("Frida instrumentation of a running dynamic analysis.")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("scripts")
                .about("Lists the available Frida scripts.")
                .arg(device_arg()),
        )
        .subcommand(
            SubCommand::with_name("script")
                .about("Shows the code of a Frida script.")
                .arg(
                    Arg::with_name("name")
                        .value_name("NAME")
                        .required(true)
                        .help("Script name."),
                )
                .arg(device_arg()),
        )
        .subcommand(
            SubCommand::with_name("instrument")
                .about("Spawns, attaches to or lists the processes of the application.")
                .arg(hash_arg())
                .arg(
                    Arg::with_name("action")
                        .long("action")
                        .value_name("ACTION")
                        .takes_value(true)
                        .possible_values(&["spawn", "session", "ps"])
                        .default_value("spawn")
                        .help("Instrumentation action."),
                )
                .arg(
                    Arg::with_name("hook")
                        .long("hook")
                        .value_name("HOOK")
                        .takes_value(true)
                        .multiple(true)
                        .number_of_values(1)
                        .help("Default hook to load, in order. Can be repeated."),
                )
                .arg(
                    Arg::with_name("aux")
                        .long("aux")
                        .value_name("HOOK")
                        .takes_value(true)
                        .multiple(true)
                        .number_of_values(1)
                        .help("Auxiliary hook to load, in order. Can be repeated."),
                )
                .arg(
                    Arg::with_name("code")
                        .long("code")
                        .value_name("FILE")
                        .takes_value(true)
                        .help("File with additional Frida code to inject."),
                )
                .arg(
                    Arg::with_name("class-name")
                        .long("class-name")
                        .value_name("CLASS")
                        .takes_value(true)
                        .help("Class to enumerate methods of."),
                )
                .arg(
                    Arg::with_name("class-search")
                        .long("class-search")
                        .value_name("PATTERN")
                        .takes_value(true)
                        .help("Pattern to search loaded classes for."),
                )
                .arg(
                    Arg::with_name("class-trace")
                        .long("class-trace")
                        .value_name("CLASS")
                        .takes_value(true)
                        .help("Class to trace all methods of."),
                )
                .arg(
                    Arg::with_name("pid")
                        .long("pid")
                        .value_name("PID")
                        .takes_value(true)
                        .help("Process to attach to, for the `session` action."),
                )
                .arg(
                    Arg::with_name("new-package")
                        .long("new-package")
                        .value_name("PACKAGE")
                        .takes_value(true)
                        .help("Package to spawn instead of the analyzed one."),
                ),
        )
        .subcommand(
            SubCommand::with_name("monitor")
                .about("Shows the API monitor output.")
                .arg(hash_arg()),
        )
        .subcommand(
            SubCommand::with_name("logs")
                .about("Shows the Frida logs.")
                .arg(hash_arg()),
        )
        .subcommand(
            SubCommand::with_name("deps")
                .about("Shows the runtime dependencies collected by Frida.")
                .arg(hash_arg()),
        )
}

#[cfg(test)]
mod tests {
    use super::generate_cli;

    #[test]
    fn it_parses_repeated_hooks_in_order() {
        let matches = generate_cli().get_matches_from(vec![
            "mobsf-client",
            "frida",
            "instrument",
            "H1",
            "--hook",
            "api_monitor",
            "--hook",
            "ssl_pinning_bypass",
            "--aux",
            "string_catch",
        ]);
        let (_, frida) = matches.subcommand();
        let (_, instrument) = frida.unwrap().subcommand();
        let instrument = instrument.unwrap();

        let hooks: Vec<_> = instrument.values_of("hook").unwrap().collect();
        assert_eq!(hooks, vec!["api_monitor", "ssl_pinning_bypass"]);
        assert_eq!(instrument.value_of("action"), Some("spawn"));
    }

    #[test]
    fn it_requires_subcommand() {
        assert!(generate_cli()
            .get_matches_from_safe(vec!["mobsf-client"])
            .is_err());
    }
}
