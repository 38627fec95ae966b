//! Tax profile command implementations

use anyhow::{Context, Result};
use coffer_core::{Engine, FilingStatus, Jurisdiction, TaxProfile, TaxRegime};

use super::print_json;

/// Fields to change on a stored profile; `None` leaves a field as is
#[derive(Debug, Default, Clone)]
pub struct ProfileUpdate {
    pub country: Option<String>,
    pub filing_status: Option<String>,
    pub state: Option<String>,
    pub state_rate: Option<f64>,
    pub regime: Option<String>,
    pub presumptive: Option<bool>,
    pub section_80c: Option<f64>,
    pub section_80d: Option<f64>,
    pub section_80e: Option<f64>,
    pub senior_citizen: Option<bool>,
}

impl ProfileUpdate {
    pub fn apply(self, mut profile: TaxProfile) -> Result<TaxProfile> {
        if let Some(country) = self.country {
            profile.country = country.to_uppercase();
        }
        if let Some(status) = self.filing_status {
            profile.filing_status = status
                .parse::<FilingStatus>()
                .map_err(anyhow::Error::msg)?;
        }
        if let Some(state) = self.state {
            profile.state = Some(state.to_uppercase());
        }
        if let Some(rate) = self.state_rate {
            if !(0.0..=1.0).contains(&rate) {
                anyhow::bail!("State rate must be between 0 and 1, got {}", rate);
            }
            profile.state_tax_rate = Some(rate);
        }
        if let Some(regime) = self.regime {
            profile.tax_regime = regime.parse::<TaxRegime>().map_err(anyhow::Error::msg)?;
        }
        if let Some(presumptive) = self.presumptive {
            profile.presumptive_taxation = presumptive;
        }
        if let Some(amount) = self.section_80c {
            profile.section_80c = amount.max(0.0);
        }
        if let Some(amount) = self.section_80d {
            profile.section_80d = amount.max(0.0);
        }
        if let Some(amount) = self.section_80e {
            profile.section_80e = amount.max(0.0);
        }
        if let Some(senior) = self.senior_citizen {
            profile.senior_citizen = senior;
        }
        Ok(profile)
    }
}

pub async fn cmd_profile_show(engine: &Engine, user: &str, json: bool) -> Result<()> {
    let profile = engine.profile(user).await?;
    if json {
        return print_json(&serde_json::to_value(&profile)?);
    }
    print_profile(user, &profile);
    Ok(())
}

pub async fn cmd_profile_set(engine: &Engine, user: &str, update: ProfileUpdate) -> Result<()> {
    let current = engine.profile(user).await?;
    let profile = update.apply(current)?;
    engine
        .set_profile(user, &profile)
        .await
        .context("Failed to save tax profile")?;
    println!("✅ Tax profile updated");
    print_profile(user, &profile);
    Ok(())
}

fn print_profile(user: &str, profile: &TaxProfile) {
    println!();
    println!("👤 Tax profile for {}", user);
    println!("   ─────────────────────────────────────────────");
    println!("   Country:        {}", profile.country);
    match Jurisdiction::from_country(&profile.country) {
        Ok(Jurisdiction::India) => {
            println!("   Regime:         {}", profile.tax_regime);
            println!(
                "   Presumptive:    {}",
                if profile.presumptive_taxation { "yes (44ADA)" } else { "no" }
            );
            println!(
                "   80C / 80D / 80E: {:.0} / {:.0} / {:.0}",
                profile.section_80c, profile.section_80d, profile.section_80e
            );
        }
        _ => {
            println!("   Filing status:  {}", profile.filing_status);
            println!(
                "   State:          {}",
                profile.state.as_deref().unwrap_or("(not set)")
            );
            if let Some(rate) = profile.state_tax_rate {
                println!("   State rate:     {:.2}%", rate * 100.0);
            }
        }
    }
}
