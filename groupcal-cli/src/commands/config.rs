use anyhow::Result;
use groupcal_core::GroupCalConfig;
use groupcal_core::store::STORE_FILE;
use owo_colors::OwoColorize;

pub fn run(config: &GroupCalConfig) -> Result<()> {
    let config_path = GroupCalConfig::config_path()?;

    println!("{}", "Paths".bold());
    println!("  Config:  {}", config_path.display());
    println!("  Data:    {}", config.data_path().join(STORE_FILE).display());

    println!();
    println!("{}", "Identity".bold());
    match &config.identity {
        Some(identity) => println!("  {} <{}>", identity.display_label(), identity.email),
        None => println!("  {}", "not configured".dimmed()),
    }

    if let Some(schedule) = &config.default_schedule {
        println!();
        println!("{}", "Default schedule".bold());
        println!("  {schedule}");
    }

    Ok(())
}
