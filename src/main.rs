use azure_vnet_peering::azure::AzCliProvider;
use azure_vnet_peering::config::{ProviderKind, Settings, NIL_SUBSCRIPTION};
use azure_vnet_peering::provider::MemoryProvider;
use azure_vnet_peering::sample::{run_sample, SampleNames};
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Do as little as possible in main.rs as it can't contain any tests
    log4rs::init_file("log4rs.yml", Default::default())
        .map_err(|e| format!("Error initializing log4rs: {e}"))?;
    dotenv::dotenv().ok();
    //
    log::info!("#Start main()");

    let settings = Settings::from_env()?;
    let names = SampleNames::random(&settings);
    log::info!("Settings: {settings:?}");

    match settings.provider {
        ProviderKind::Memory => {
            let subscription = settings
                .subscription_id
                .clone()
                .unwrap_or_else(|| NIL_SUBSCRIPTION.to_string());
            run_sample(MemoryProvider::new(subscription), &settings, &names).await?;
        }
        ProviderKind::AzCli => {
            let provider = match &settings.subscription_id {
                Some(sub) => AzCliProvider::new(sub.clone()),
                None => AzCliProvider::from_default_subscription().await?,
            };
            run_sample(provider, &settings, &names).await?;
        }
    }

    log::info!("#End main()");
    Ok(())
}
