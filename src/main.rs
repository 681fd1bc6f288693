use liftdispatch::config;
use liftdispatch::init;
use liftdispatch::model::serial;
use liftdispatch::model::RequestStatus;
use liftdispatch::print;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let options = match init::parse_args() {
        Ok(options) => options,
        Err(e) => {
            print::err(format!("{:#}", e));
            std::process::exit(2);
        }
    };
    if options.quiet {
        print::set_all(false);
        *config::PRINT_ERR_ON.lock().unwrap_or_else(|p| p.into_inner()) = true;
    }

    let system = init::build_default(options.capacity);
    let id = config::DEFAULT_ELEVATOR_ID;
    print::info(format!(
        "Elevator {} ready with capacity {}, {} call(s) queued",
        id,
        options.capacity,
        options.calls.len()
    ));

    /* Submit every call up front, the scheduler decides the order */
    for call in &options.calls {
        if !system.registry.submit_call(id, call.pickup, call.destination, call.passengers).await {
            print::warn(format!(
                "Call {} -> {} with {} rider(s) was refused",
                call.pickup, call.destination, call.passengers
            ));
        }
    }

    /* Print the status until the car has nothing left to do */
    let status = loop {
        tokio::time::sleep(config::STATUS_PRINT_PERIOD).await;
        let Some(status) = system.registry.get_status(id).await else {
            anyhow::bail!("elevator {} disappeared", id);
        };
        if status.stops.is_empty() {
            break status;
        }
        print::status(&status);
    };

    print::status(&status);
    if options.json {
        println!("{}", serial::status_json(&status)?);
    }

    let store = system.store.clone();
    let stats = system.shutdown().await?;
    let served = store
        .requests()
        .await
        .iter()
        .filter(|r| r.status == RequestStatus::Served)
        .count();
    print::ok(format!(
        "Done: {} request(s) served, {} event(s) stored, {} store write(s) dropped",
        served,
        store.events().await.len(),
        stats.dropped
    ));
    Ok(())
}
