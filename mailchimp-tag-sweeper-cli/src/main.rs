use chrono::NaiveDate;
use clap::Parser;
use mailchimp_tag_sweeper::{
    sweep, ArchiveOutcome, Client, Credentials, LineConfirm, RunMode, Settings, TagPolicy,
    UrlMatch,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser, Clone)]
#[command(name = "mailchimp-tag-sweeper")]
#[command(
    about = "Archives tagged Mailchimp members who did not click a campaign's confirmation link"
)]
struct Cli {
    /// Compute the members to archive but never delete anything
    #[arg(short, long)]
    dry: bool,
    /// Archive without asking for confirmation
    #[arg(short, long)]
    force: bool,
    /// Log request details
    #[arg(short, long)]
    verbose: bool,
    /// Print the members to archive as CSV on stdout
    #[arg(long)]
    show_candidates: bool,

    #[arg(long, env = "MAILCHIMP_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    /// Overrides the URL derived from the API key's data center
    #[arg(long, env = "MAILCHIMP_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "SWEEP_CAMPAIGN_DATE", default_value = "2020-03-25")]
    campaign_date: NaiveDate,
    #[arg(
        long,
        env = "SWEEP_CAMPAIGN_TITLE",
        default_value = "Inaktive Abonnenten Entfernen"
    )]
    campaign_title: String,
    #[arg(long, env = "SWEEP_TAG_NAME", default_value = "Inactive")]
    tag_name: String,
    #[arg(
        long,
        env = "SWEEP_CONFIRMATION_URL",
        default_value = "createrawvision.de/newsletter-abo-bestaetigt"
    )]
    confirmation_url: String,
    /// Also search campaigns sent this many days before the campaign date
    #[arg(long, env = "SWEEP_LOOKBACK_DAYS", default_value_t = 0)]
    lookback_days: u32,
    /// Require the tracked URL to equal the confirmation URL
    #[arg(long)]
    exact_url: bool,
    /// Fail when several tags share the tag name
    #[arg(long)]
    strict_tag: bool,
}

impl Cli {
    fn settings(&self) -> Settings {
        let mut settings = Settings::new(
            self.campaign_date,
            self.campaign_title.as_str(),
            self.tag_name.as_str(),
            self.confirmation_url.as_str(),
        );
        settings.lookback_days = self.lookback_days;
        if self.exact_url {
            settings.url_match = UrlMatch::Exact;
        }
        if self.strict_tag {
            settings.tag_policy = TagPolicy::Strict;
        }
        settings
    }

    fn run_mode(&self) -> RunMode {
        RunMode {
            dry_run: self.dry,
            force_delete: self.force,
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,mailchimp_tag_sweeper={level},mailchimp_tag_sweeper_cli={level}"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();
    let args = Cli::parse();
    init_logging(args.verbose);

    let credentials = Credentials::from_api_key(args.api_key.clone(), args.base_url.clone())?;
    let client = Client::from_credentials(&credentials)?;
    let settings = args.settings();

    let report = sweep::run(
        &client,
        &settings,
        args.run_mode(),
        &mut LineConfirm::stdio(),
    )
    .await?;

    if args.show_candidates {
        println!("id,email_address");
        for (id, email_address) in report.candidates.iter() {
            println!("{},{}", id, email_address);
        }
    }

    match report.outcome {
        ArchiveOutcome::Empty => println!("No members to archive"),
        ArchiveOutcome::DryRun { count } => println!("Would archive {} members", count),
        ArchiveOutcome::Declined { count } => println!("Not archiving {} members", count),
        ArchiveOutcome::Submitted { count, batch_id } => println!(
            "Archiving {} members by batch operation with ID {}",
            count, batch_id
        ),
    }

    Ok(())
}
