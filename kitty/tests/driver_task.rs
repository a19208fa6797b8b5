use kitty::analysis::Interpreter;
use kitty::config::HostConfig;
use kitty::error::{KittyError, RuntimeError};
use kitty::run;
use kitty_driver::{spawn_driver_task, DriverError, SimulatedDriver};


const CONFIG: &str = r#"
[interpreter]
max_steps = 1000

[[devices]]
name = "pan"
type = "servo"

[[devices]]
name = "tilt"
type = "servo"

[[devices]]
name = "lamp"
type = "led"

[[groups]]
name = "head"
members = ["pan", "tilt"]

[[groups]]
name = "everything"
members = ["head", "lamp"]
"#;


#[tokio::test(flavor = "multi_thread")]
async fn test_script_through_driver_task() {
    let config = HostConfig::from_toml_str(CONFIG).unwrap();
    let devices = config.build_device_table().unwrap();
    let (sink, handle) = spawn_driver_task(SimulatedDriver::new());
    let result = tokio::task::spawn_blocking(move || {
        let mut interpreter = Interpreter::with_options(sink, config.interpreter.clone());
        let program = kitty::compile(
            "set_to everything to 20\nwhile pan < 80 do\n  move_by head by 15\nend\nset_to lamp to pan + tilt",
        )?;
        interpreter.execute(&program, &devices)?;
        Ok::<u64, KittyError>(interpreter.steps())
    })
    .await
    .unwrap();
    assert!(result.is_ok());

    // The interpreter and its sink are gone, so the driver task returns
    let driver = handle.await.unwrap();
    assert_eq!(driver.value("pan"), Some(80.0));
    assert_eq!(driver.value("tilt"), Some(80.0));
    assert_eq!(driver.value("lamp"), Some(100.0));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stopped_driver_is_reported() {
    let config = HostConfig::from_toml_str(CONFIG).unwrap();
    let devices = config.build_device_table().unwrap();
    let (sink, handle) = spawn_driver_task(SimulatedDriver::new());
    handle.abort();
    let _ = handle.await;
    let result = tokio::task::spawn_blocking(move || run("move_by lamp by 5", &devices, sink))
        .await
        .unwrap();
    assert_eq!(
        result,
        Err(KittyError::Runtime(RuntimeError::DeviceActionFailed {
            device: "lamp".to_string(),
            source: DriverError::Disconnected,
        }))
    );
}
