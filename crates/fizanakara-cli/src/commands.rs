//! Command parsing and execution for the `fizanakara` binary.

use std::io::{self, Write};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Datelike, Local};
use tracing::{info, warn};

use fizanakara_core::config::Config;
use fizanakara_core::filter::{ContributionFilter, MemberFilter};
use fizanakara_core::models::{
    Contribution, ContributionStatus, Gender, LoginRequest, MemberStatus, Payment, PaymentRequest,
    Person,
};
use fizanakara_core::stats::DashboardStats;
use fizanakara_core::utils::{
    cmp_ignore_case, format_currency, format_date, format_phone, format_sequence_number,
    truncate_string,
};
use fizanakara_core::Console;

/// Column width for names in list output
const NAME_WIDTH: usize = 28;

/// Prefix of member sequence numbers
const SEQUENCE_PREFIX: &str = "MBR";

pub const USAGE: &str = "\
Usage: fizanakara <command> [args]

Commands:
  login [email]                   Log in (password is prompted)
  logout                          Forget stored credentials
  whoami                          Show the logged-in administrator
  members [query] [--gender g] [--status s] [--district d] [--tribute t]
                                  List members, optionally filtered
  children <member-id>            List a member's dependents
  promote <member-id>             Promote a dependent to full member
  contributions <year> [person] [--status s]
                                  List contributions for a year
  generate <year>                 Generate the year's contributions
  pay <contribution-id> <amount>  Record a completed payment
  payments <contribution-id>      List payments for a contribution
  districts                       List districts
  tributes                        List tributes
  stats <year>                    Dashboard figures for a year
  health                          Check the backend is reachable";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login { email: Option<String> },
    Logout,
    WhoAmI,
    Members { filter: MemberFilter },
    Children { member_id: String },
    Promote { member_id: String },
    Contributions {
        year: i32,
        person_id: Option<String>,
        status: Option<ContributionStatus>,
    },
    Generate { year: i32 },
    Pay { contribution_id: String, amount: f64 },
    Payments { contribution_id: String },
    Districts,
    Tributes,
    Stats { year: i32 },
    Health,
    Help,
}

impl Command {
    /// Parse the arguments following the program name
    pub fn parse(args: &[String]) -> Result<Self> {
        let Some((name, rest)) = args.split_first() else {
            return Ok(Command::Help);
        };
        let arg = |i: usize, what: &str| -> Result<String> {
            rest.get(i)
                .cloned()
                .ok_or_else(|| anyhow!("Missing {} for `{}`", what, name))
        };

        let command = match name.as_str() {
            "login" => Command::Login {
                email: rest.first().cloned(),
            },
            "logout" => Command::Logout,
            "whoami" => Command::WhoAmI,
            "members" => Command::Members {
                filter: parse_member_filter(rest)?,
            },
            "children" => Command::Children {
                member_id: arg(0, "member id")?,
            },
            "promote" => Command::Promote {
                member_id: arg(0, "member id")?,
            },
            "contributions" => {
                let (positional, flags) = split_flags(rest)?;
                let mut status = None;
                for (flag, value) in flags {
                    match flag {
                        "--status" => status = Some(parse_choice(value, ContributionStatus::from_str)?),
                        other => bail!("Unknown option `{}` for `contributions`", other),
                    }
                }
                let year = positional
                    .first()
                    .ok_or_else(|| anyhow!("Missing year for `contributions`"))?;
                Command::Contributions {
                    year: parse_year(year)?,
                    person_id: positional.get(1).map(|p| p.to_string()),
                    status,
                }
            }
            "generate" => Command::Generate {
                year: parse_year(&arg(0, "year")?)?,
            },
            "pay" => Command::Pay {
                contribution_id: arg(0, "contribution id")?,
                amount: parse_amount(&arg(1, "amount")?)?,
            },
            "payments" => Command::Payments {
                contribution_id: arg(0, "contribution id")?,
            },
            "districts" => Command::Districts,
            "tributes" => Command::Tributes,
            "stats" => Command::Stats {
                year: match rest.first() {
                    Some(year) => parse_year(year)?,
                    None => Local::now().year(),
                },
            },
            "health" => Command::Health,
            "help" | "--help" | "-h" => Command::Help,
            other => bail!("Unknown command `{}`\n\n{}", other, USAGE),
        };
        Ok(command)
    }

    /// Commands that work without a stored session
    pub fn is_public(&self) -> bool {
        matches!(
            self,
            Command::Login { .. } | Command::Logout | Command::Health | Command::Help
        )
    }
}

/// Separate `--flag value` pairs from positional arguments
fn split_flags(args: &[String]) -> Result<(Vec<&str>, Vec<(&str, &str)>)> {
    let mut positional = Vec::new();
    let mut flags = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg.starts_with("--") {
            let value = iter
                .next()
                .ok_or_else(|| anyhow!("Missing value for `{}`", arg))?;
            flags.push((arg.as_str(), value.as_str()));
        } else {
            positional.push(arg.as_str());
        }
    }
    Ok((positional, flags))
}

fn parse_choice<T>(value: &str, parse: fn(&str) -> Option<T>) -> Result<T> {
    parse(value).ok_or_else(|| anyhow!("Invalid value: {}", value))
}

fn parse_member_filter(args: &[String]) -> Result<MemberFilter> {
    let (positional, flags) = split_flags(args)?;
    let mut filter = MemberFilter::with_search(positional.join(" "));
    for (flag, value) in flags {
        match flag {
            "--gender" => filter.gender = Some(parse_choice(value, Gender::from_str)?),
            "--status" => filter.status = Some(parse_choice(value, MemberStatus::from_str)?),
            "--district" => filter.district = Some(value.to_string()),
            "--tribute" => filter.tribute = Some(value.to_string()),
            other => bail!("Unknown option `{}` for `members`", other),
        }
    }
    Ok(filter)
}

fn parse_year(s: &str) -> Result<i32> {
    s.trim()
        .parse()
        .with_context(|| format!("Invalid year: {}", s))
}

fn parse_amount(s: &str) -> Result<f64> {
    let cleaned: String = s.chars().filter(|c| !c.is_whitespace() && *c != '_').collect();
    let amount: f64 = cleaned
        .replace(',', ".")
        .parse()
        .with_context(|| format!("Invalid amount: {}", s))?;
    if !amount.is_finite() || amount <= 0.0 {
        bail!("Amount must be positive");
    }
    Ok(amount)
}

pub async fn run(command: Command, console: &Console, config: &mut Config) -> Result<()> {
    if !command.is_public() && !console.session().is_authenticated() {
        bail!("Not logged in, run `fizanakara login`");
    }

    match command {
        Command::Help => println!("{}", USAGE),
        Command::Login { email } => login(console, config, email).await?,
        Command::Logout => {
            console.logout()?;
            println!("Logged out");
        }
        Command::WhoAmI => match console.api().restore_session().await? {
            Some(admin) => println!(
                "{} <{}> - {}",
                admin.full_name(),
                admin.email,
                admin.role.label()
            ),
            None => println!("Not logged in"),
        },
        Command::Members { filter } => {
            let members = console.members().await?;
            let mut found = filter.apply(&members);
            found.sort_by(|a, b| cmp_ignore_case(&a.sort_name(), &b.sort_name()));
            print_people(&found);
            println!("{} of {} members", found.len(), members.len());
        }
        Command::Children { member_id } => {
            let children = console.children(&member_id).await?;
            print_people(&children.iter().collect::<Vec<_>>());
        }
        Command::Promote { member_id } => {
            let person = console.promote_member(&member_id).await?;
            println!("{} is now a full member", person.full_name());
        }
        Command::Contributions {
            year,
            person_id,
            status,
        } => {
            let contributions = console.contributions(person_id.as_deref(), Some(year)).await?;
            let filter = ContributionFilter {
                status,
                ..Default::default()
            };
            let shown: Vec<Contribution> = filter.apply(&contributions).into_iter().cloned().collect();
            print_contributions(&shown);
        }
        Command::Generate { year } => {
            let generated = console.generate_contributions(year).await?;
            println!("Generated {} contributions for {}", generated.len(), year);
        }
        Command::Pay {
            contribution_id,
            amount,
        } => {
            let payment = console
                .create_payment(&PaymentRequest::completed(contribution_id, amount))
                .await?;
            println!(
                "Recorded {} on {} ({})",
                format_currency(payment.amount_paid),
                payment.contribution_id,
                payment.id
            );
        }
        Command::Payments { contribution_id } => {
            let payments = console.payments(&contribution_id).await?;
            print_payments(&payments);
        }
        Command::Districts => {
            for district in console.districts().await? {
                println!("{:>4}  {}", district.id, district.name);
            }
        }
        Command::Tributes => {
            for tribute in console.tributes().await? {
                println!("{:>4}  {}", tribute.id, tribute.name);
            }
        }
        Command::Stats { year } => {
            let stats = console.dashboard(year).await?;
            print_stats(year, &stats);
        }
        Command::Health => println!("{}", console.api().health().await?),
    }
    Ok(())
}

async fn login(console: &Console, config: &mut Config, email: Option<String>) -> Result<()> {
    let email = match email.or_else(|| config.last_email.clone()) {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    let password = rpassword::prompt_password(format!("Password for {}: ", email))?;

    let login = console
        .login(&LoginRequest {
            email: email.trim().to_string(),
            password,
        })
        .await?;

    config.last_email = Some(email.trim().to_string());
    if let Err(e) = Config::remember_email(email.trim()) {
        warn!(error = %e, "Failed to save config");
    }

    info!(user_id = %login.user.id, "Login succeeded");
    println!("Logged in as {} ({})", login.user.display_name(), login.role.label());
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

// ===== Output =====

fn print_people(people: &[&Person]) {
    let today = Local::now().date_naive();
    for person in people {
        let number = person
            .sequence_number
            .map(|n| format_sequence_number(n, SEQUENCE_PREFIX))
            .unwrap_or_else(|| person.id.clone());
        let age = person
            .age_on(today)
            .map(|a| a.to_string())
            .unwrap_or_else(|| "-".to_string());
        let marker = if person.is_eligible_for_promotion(today) { " *" } else { "" };

        println!(
            "{:<12} {:<width$} {:>3}  {:<14} {:<16} {}{}",
            number,
            truncate_string(&person.full_name(), NAME_WIDTH),
            age,
            person.phone_number.as_deref().map(format_phone).unwrap_or_default(),
            person.district_name.as_deref().unwrap_or("-"),
            person.status.map(|s| s.label()).unwrap_or("-"),
            marker,
            width = NAME_WIDTH,
        );
    }
}

fn print_contributions(contributions: &[Contribution]) {
    for c in contributions {
        println!(
            "{:<10} {:<width$} {:>14} {:>14} {:>14} {:>4}%  {}",
            c.id,
            truncate_string(c.debtor_name(), NAME_WIDTH),
            format_currency(c.amount),
            format_currency(c.total_paid),
            format_currency(c.remaining),
            c.payment_percentage(),
            c.status.map(|s| s.label()).unwrap_or("-"),
            width = NAME_WIDTH,
        );
    }
}

fn print_payments(payments: &[Payment]) {
    for p in payments {
        println!(
            "{:<10} {:>14}  {:<16} {}",
            p.id,
            format_currency(p.amount_paid),
            p.payment_date.as_deref().map(format_date).unwrap_or_default(),
            p.status.label(),
        );
    }
}

fn print_stats(year: i32, stats: &DashboardStats) {
    println!("Contributions {}", year);
    println!("  Members:          {}", stats.total_members);
    println!(
        "  Collected:        {} / {} ({:.0}%)",
        format_currency(stats.total_paid),
        format_currency(stats.total_expected),
        stats.progress_percent
    );
    println!("  Outstanding:      {}", format_currency(stats.total_remaining));
    println!("  Up to date:       {}", stats.up_to_date);
    println!("  Late:             {}", stats.late);
    println!("  Average/member:   {}", format_currency(stats.average_contribution));
    match stats.top_district {
        Some((ref name, count)) => println!("  Top district:     {} ({})", name, count),
        None => println!("  Top district:     -"),
    }
    if !stats.tributes.is_empty() {
        println!("  Tributes:         {}", stats.tributes.join(", "));
    }
    if !stats.at_risk.is_empty() {
        println!("\nLargest outstanding balances:");
        for c in &stats.at_risk {
            println!("  {:<width$} {:>14}", c.debtor_name(), format_currency(c.remaining), width = NAME_WIDTH);
        }
    }
}
