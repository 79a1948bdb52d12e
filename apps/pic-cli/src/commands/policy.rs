// policy.rs — `pic policy`: show the effective impact policy.

use super::Bootstrap;

pub fn execute(boot: &Bootstrap) -> anyhow::Result<()> {
    let source = boot.policy_source();
    let policy = boot.load_policy()?;
    println!("Policy source: {}", source);
    println!("{}", serde_json::to_string_pretty(&policy)?);
    Ok(())
}
