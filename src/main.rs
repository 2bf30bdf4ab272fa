//! bk - Track real-estate listings, clients and transactions.

use brokerage::action_log;
use brokerage::cli::{
    Cli, ClientCommands, Commands, ConfigCommands, InterestCommands, MilestoneCommands,
    PropertyCommands, SystemCommands, TransactionCommands,
};
use brokerage::commands::{self, NewTransaction, Output};
use brokerage::config::{
    ConfigOverrides, OutputFormat, ResolvedConfig, resolve_config, resolve_data_dir,
    session_config_path, system_config_path,
};
use brokerage::models::FinancialsPatch;
use brokerage::remote::FileBackend;
use clap::Parser;
use std::path::Path;
use std::process;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the tracing filter directive.
const LOG_ENV: &str = "BK_LOG";

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let human_flag = cli.human_readable;

    let data_dir = match resolve_data_dir(cli.data_dir.as_deref()) {
        Ok(resolved) => resolved.value,
        Err(e) => fail(&e, human_flag),
    };

    let overrides = if human_flag {
        ConfigOverrides::new().with_output_format(OutputFormat::Human)
    } else {
        ConfigOverrides::new()
    };
    let config = match resolve_config(&data_dir, &overrides) {
        Ok(config) => config,
        Err(e) => fail(&e, human_flag),
    };
    let human = *config.output_format() == OutputFormat::Human;

    let cmd_name = cli.command.name();
    let args_json = cli.command.args();

    let start = Instant::now();
    let result = run_command(cli.command, &data_dir, &config, human);
    let duration = start.elapsed().as_millis() as u64;

    // Only log into directories that have been initialized.
    if config.action_log_enabled() && FileBackend::exists(&data_dir) {
        let error = result.as_ref().err().map(|e| e.to_string());
        action_log::log_action(
            &data_dir,
            &cmd_name,
            &args_json,
            result.is_ok(),
            error,
            duration,
        );
    }

    if let Err(e) = result {
        fail(&e, human);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(error: &brokerage::Error, human: bool) -> ! {
    if human {
        eprintln!("Error: {}", error);
    } else {
        eprintln!("{}", serde_json::json!({ "error": error.to_string() }));
    }
    process::exit(1);
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

fn run_command(
    command: Commands,
    data_dir: &Path,
    config: &ResolvedConfig,
    human: bool,
) -> Result<(), brokerage::Error> {
    match command {
        Commands::System { command } => match command {
            SystemCommands::Init => output(&commands::system_init(data_dir)?, human),
        },

        Commands::Config { command } => match command {
            ConfigCommands::Show => output(&commands::config_show(config), human),
            ConfigCommands::Get { key } => output(&commands::config_get(config, &key)?, human),
            ConfigCommands::Set { key, value, system } => {
                let path = if system {
                    system_config_path().ok_or_else(|| {
                        brokerage::Error::Config("cannot determine a config directory".to_string())
                    })?
                } else {
                    session_config_path(data_dir)
                };
                output(&commands::config_set(&path, &key, &value)?, human)
            }
        },

        Commands::Property { command } => {
            let mut bk = commands::open_brokerage(data_dir, config.service_settings())?;
            match command {
                PropertyCommands::Create {
                    title,
                    price,
                    agent,
                    status,
                    fields,
                } => {
                    let result = commands::property_create(
                        &mut bk,
                        &title,
                        price,
                        &agent,
                        status.as_deref(),
                        &fields,
                    )?;
                    output(&result, human);
                }
                PropertyCommands::List { filter, page } => {
                    output(&commands::property_list(&bk, &filter, &page)?, human)
                }
                PropertyCommands::Show { id } => output(&commands::property_show(&bk, &id)?, human),
                PropertyCommands::Update {
                    id,
                    title,
                    price,
                    agent,
                    fields,
                } => {
                    let result = commands::property_update(
                        &mut bk,
                        &id,
                        title.as_deref(),
                        price,
                        agent.as_deref(),
                        &fields,
                    )?;
                    output(&result, human);
                }
                PropertyCommands::Status { id, status } => {
                    output(&commands::property_status(&mut bk, &id, &status)?, human)
                }
                PropertyCommands::Delete { id } => {
                    output(&commands::property_delete(&mut bk, &id)?, human)
                }
                PropertyCommands::Stats { filter } => {
                    output(&commands::property_stats(&bk, &filter)?, human)
                }
            }
        }

        Commands::Client { command } => {
            let mut bk = commands::open_brokerage(data_dir, config.service_settings())?;
            match command {
                ClientCommands::Create {
                    first_name,
                    last_name,
                    email,
                    follow_up,
                    fields,
                } => {
                    let result = commands::client_create(
                        &mut bk,
                        &first_name,
                        &last_name,
                        &email,
                        follow_up.as_deref(),
                        &fields,
                    )?;
                    output(&result, human);
                }
                ClientCommands::List { filter, page } => {
                    output(&commands::client_list(&bk, &filter, &page)?, human)
                }
                ClientCommands::Show { id } => output(&commands::client_show(&bk, &id)?, human),
                ClientCommands::Update {
                    id,
                    first_name,
                    last_name,
                    email,
                    fields,
                } => {
                    let result = commands::client_update(
                        &mut bk,
                        &id,
                        first_name.as_deref(),
                        last_name.as_deref(),
                        email.as_deref(),
                        &fields,
                    )?;
                    output(&result, human);
                }
                ClientCommands::Status { id, status } => {
                    output(&commands::client_status(&mut bk, &id, &status)?, human)
                }
                ClientCommands::Delete { id } => {
                    output(&commands::client_delete(&mut bk, &id)?, human)
                }
                ClientCommands::Note {
                    id,
                    content,
                    note_type,
                    author,
                } => {
                    let result =
                        commands::client_note(&mut bk, &id, &content, &note_type, &author)?;
                    output(&result, human);
                }
                ClientCommands::FollowUp { id, at, clear: _ } => {
                    output(&commands::client_follow_up(&mut bk, &id, at.as_deref())?, human)
                }
                ClientCommands::Interest { command } => match command {
                    InterestCommands::Add { id, property_id } => output(
                        &commands::client_interest_add(&mut bk, &id, &property_id)?,
                        human,
                    ),
                    InterestCommands::Remove { id, property_id } => output(
                        &commands::client_interest_remove(&mut bk, &id, &property_id)?,
                        human,
                    ),
                },
                ClientCommands::Stats { filter } => {
                    output(&commands::client_stats(&bk, &filter)?, human)
                }
            }
        }

        Commands::Transaction { command } => {
            let mut bk = commands::open_brokerage(data_dir, config.service_settings())?;
            match command {
                TransactionCommands::Create {
                    property,
                    client,
                    agent,
                    sale_price,
                    transaction_type,
                    list_price,
                    commission_rate,
                    commission_amount,
                    contract_date,
                    closing_date,
                } => {
                    let input = NewTransaction {
                        property: &property,
                        client: &client,
                        agent: &agent,
                        sale_price,
                        transaction_type: transaction_type.as_deref(),
                        list_price,
                        commission_rate,
                        commission_amount,
                        contract_date: contract_date.as_deref(),
                        closing_date: closing_date.as_deref(),
                    };
                    output(&commands::transaction_create(&mut bk, input)?, human);
                }
                TransactionCommands::List { filter } => {
                    output(&commands::transaction_list(&bk, &filter)?, human)
                }
                TransactionCommands::Show { id } => {
                    output(&commands::transaction_show(&bk, &id)?, human)
                }
                TransactionCommands::Status { id, status } => {
                    output(&commands::transaction_status(&mut bk, &id, &status)?, human)
                }
                TransactionCommands::Milestone { command } => match command {
                    MilestoneCommands::Add {
                        id,
                        name,
                        due,
                        responsible,
                        description,
                    } => {
                        let result = commands::transaction_milestone_add(
                            &mut bk,
                            &id,
                            &name,
                            &due,
                            &responsible,
                            description.as_deref(),
                        )?;
                        output(&result, human);
                    }
                    MilestoneCommands::Complete { id, milestone_id } => output(
                        &commands::transaction_milestone_complete(&mut bk, &id, &milestone_id)?,
                        human,
                    ),
                },
                TransactionCommands::Note {
                    id,
                    content,
                    note_type,
                    author,
                } => {
                    let result =
                        commands::transaction_note(&mut bk, &id, &content, &note_type, &author)?;
                    output(&result, human);
                }
                TransactionCommands::Financials {
                    id,
                    sale_price,
                    list_price,
                    commission_rate,
                    commission_amount,
                } => {
                    let patch = FinancialsPatch {
                        sale_price,
                        list_price,
                        commission_rate,
                        commission_amount,
                    };
                    output(&commands::transaction_financials(&mut bk, &id, &patch)?, human);
                }
                TransactionCommands::CommissionPaid { id } => {
                    output(&commands::transaction_commission_paid(&mut bk, &id)?, human)
                }
                TransactionCommands::Analytics { agent, from, to } => {
                    let result = commands::transaction_analytics(
                        &bk,
                        &agent,
                        from.as_deref(),
                        to.as_deref(),
                    )?;
                    output(&result, human);
                }
                TransactionCommands::Deadlines { agent, days } => {
                    output(&commands::transaction_deadlines(&bk, &agent, days)?, human)
                }
                TransactionCommands::Stats { filter } => {
                    output(&commands::transaction_stats(&bk, &filter)?, human)
                }
            }
        }
    }

    Ok(())
}
