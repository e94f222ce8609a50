//! End-to-end tests of the load sequence.

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc, Mutex,
};

use wasmboot_error::{codes, ErrorCategory};
use wasmboot_host::{
    CallbackType, FuncSignature, HostBindings, HostBuilder, HostValue, Value, ValueType,
};
use wasmboot_loader::{
    default_bindings, state::SUCCESS_PATH, BindingsConfig, EntryPointBridge, Loader,
    LoaderConfig, LoaderState, MemorySource, RunOutcome, StateTracker, StrategyPreference,
};
use wasmboot_logging::{GuestLoggingExt, LogLevel, LogOperation, LoggingExt};

const PROGRAM: &str = r#"(module
    (import "env" "mark" (func $mark (param i32)))
    (import "env" "exit" (func $exit (param i32)))
    (global $counter (mut i32) (i32.const 0))
    (memory (export "memory") 1)
    (func (export "_start")
        (global.set $counter (i32.add (global.get $counter) (i32.const 1)))
        (call $mark (i32.const 1)))
    (func (export "counter") (result i32)
        (global.get $counter))
    (func (export "add") (param i32 i32) (result i32)
        (i32.add (local.get 0) (local.get 1))))"#;

type Events = Arc<Mutex<Vec<String>>>;

fn wasm(text: &str) -> Vec<u8> {
    wat::parse_str(text).unwrap()
}

/// Bindings that record every host-visible event in order
fn recording_bindings(events: &Events) -> HostBindings {
    let mark_events = events.clone();
    let setup_events = events.clone();
    let cleanup_events = events.clone();
    HostBuilder::new()
        .with_function("env", "mark", FuncSignature::new([ValueType::I32], []), move |ctx, args| {
            mark_events.lock().unwrap().push(format!("mark {} {}", ctx.label(), args[0]));
            Ok(vec![])
        })
        .with_exit_function("env", "exit")
        .with_lifecycle_hook(CallbackType::Setup, move |label| {
            setup_events.lock().unwrap().push(format!("setup {label}"));
        })
        .with_lifecycle_hook(CallbackType::Cleanup, move |label| {
            cleanup_events.lock().unwrap().push(format!("cleanup {label}"));
        })
        .build()
        .unwrap()
}

fn loader(bindings: HostBindings) -> Loader {
    Loader::new(LoaderConfig::default(), EntryPointBridge::new(bindings, "_start")).unwrap()
}

#[tokio::test]
async fn test_run_completes_before_reinstantiation() {
    let events = Events::default();
    let loader = loader(recording_bindings(&events));
    let source = MemorySource::new("program", wasm(PROGRAM));

    let session = loader.load(&source).await.unwrap();

    assert_eq!(session.history(), SUCCESS_PATH);
    assert_eq!(session.outcome(), RunOutcome::Returned);
    assert_eq!(
        *events.lock().unwrap(),
        vec![
            "setup instance-1".to_string(),
            "mark instance-1 1:i32".to_string(),
            "cleanup instance-1".to_string(),
            "setup instance-2".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_session_holds_second_instance() {
    let events = Events::default();
    let loader = loader(recording_bindings(&events));
    let source = MemorySource::new("program", wasm(PROGRAM));

    let mut session = loader.load(&source).await.unwrap();
    assert_eq!(session.instance().ordinal(), 2);
    assert_eq!(session.instance().label(), "instance-2");
    assert_eq!(session.instance().exit_code(), None);

    // The entry point ran on instance 1 only, so instance 2 starts fresh
    assert_eq!(session.call("counter", &[]).await.unwrap(), vec![Value::I32(0)]);
    assert_eq!(
        session.call("add", &[Value::I32(40), Value::I32(2)]).await.unwrap(),
        vec![Value::I32(42)]
    );
    assert_eq!(session.instance_mut().memory_size(), Some(65536));
    assert!(session.exports().iter().any(|export| export.name == "add"));
}

#[tokio::test]
async fn test_streaming_and_buffered_produce_identical_modules() {
    let bytes = wasm(PROGRAM);
    let streaming_source = MemorySource::new("program", bytes.clone()).with_chunk_size(7);
    let buffered_source = MemorySource::new("program", bytes.clone()).non_streaming();

    let events = Events::default();
    let streaming = loader(recording_bindings(&events))
        .with_strategy_preference(StrategyPreference::Streaming)
        .load(&streaming_source)
        .await
        .unwrap();
    let buffered = loader(recording_bindings(&events)).load(&buffered_source).await.unwrap();

    assert_eq!(streaming.module().digest(), buffered.module().digest());
    assert_eq!(streaming.module().size(), bytes.len());
    assert_eq!(streaming.module().imports(), buffered.module().imports());
    assert_eq!(streaming.module().exports(), buffered.module().exports());
    assert_eq!(streaming.history(), buffered.history());
}

#[tokio::test]
async fn test_invalid_bytes_fail_before_run() {
    let events = Events::default();
    let inputs = [b"not wasm at all".to_vec(), Vec::new(), b"\0asm\x01\0\0\0\x01\xff".to_vec()];

    for bytes in inputs {
        for preference in [StrategyPreference::Streaming, StrategyPreference::Buffered] {
            let loader = loader(recording_bindings(&events)).with_strategy_preference(preference);
            let source = MemorySource::new("broken", bytes.clone());
            let mut tracker = StateTracker::new();
            let err = loader.load_tracked(&source, &mut tracker).await.unwrap_err();

            assert!(err.is_module_error(), "{preference}: {err}");
            assert!(!tracker.history().contains(&LoaderState::Running));
            assert_eq!(tracker.state(), LoaderState::Failed);
        }
    }
    assert!(events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_bad_magic_stops_streaming_early() {
    let mut bytes = b"\x7fELF".to_vec();
    bytes.resize(4096, 0);
    let source = MemorySource::new("elf", bytes).with_chunk_size(16);
    let loader = loader(HostBindings::empty());

    let err = loader.load(&source).await.unwrap_err();
    assert_eq!(err.code, codes::INVALID_MAGIC);
    assert_eq!(source.chunks_served(), 1);
}

#[tokio::test]
async fn test_missing_import_fails_at_link() {
    let bindings = HostBuilder::new().with_exit_function("env", "exit").build().unwrap();
    let loader = loader(bindings);
    let source = MemorySource::new("program", wasm(PROGRAM));

    let mut tracker = StateTracker::new();
    let err = loader.load_tracked(&source, &mut tracker).await.unwrap_err();

    assert_eq!(err.category, ErrorCategory::Link);
    assert_eq!(err.code, codes::MISSING_IMPORT);
    assert!(err.message.contains("env.mark"), "{err}");
    assert_eq!(
        tracker.history(),
        [LoaderState::Idle, LoaderState::Fetching, LoaderState::Compiling, LoaderState::Failed]
    );
}

#[tokio::test]
async fn test_source_is_fetched_once() {
    let events = Events::default();
    let loader = loader(recording_bindings(&events));
    let source = MemorySource::new("program", wasm(PROGRAM));

    loader.load(&source).await.unwrap();
    assert_eq!(source.open_count(), 1);
}

#[tokio::test]
async fn test_exit_binding_completes_run_with_code() {
    let program = r#"(module
        (import "env" "exit" (func $exit (param i32)))
        (func (export "_start")
            (call $exit (i32.const 3))
            unreachable)
        (func (export "ping") (result i32) (i32.const 1)))"#;
    let bindings = HostBuilder::new().with_exit_function("env", "exit").build().unwrap();
    let source = MemorySource::new("exits", wasm(program));

    let mut session = loader(bindings).load(&source).await.unwrap();

    assert_eq!(session.outcome(), RunOutcome::Exited(3));
    assert_eq!(session.outcome().exit_code(), 3);
    assert_eq!(session.history().last(), Some(&LoaderState::Instantiated2));
    assert_eq!(session.call("ping", &[]).await.unwrap(), vec![Value::I32(1)]);
}

#[tokio::test]
async fn test_trap_is_entry_point_failure() {
    let program = r#"(module (func (export "_start") unreachable))"#;
    let source = MemorySource::new("traps", wasm(program));

    let mut tracker = StateTracker::new();
    let err = loader(HostBindings::empty()).load_tracked(&source, &mut tracker).await.unwrap_err();

    assert_eq!(err.code, codes::ENTRY_POINT_TRAPPED);
    assert_eq!(tracker.history()[tracker.history().len() - 2], LoaderState::Running);
}

#[tokio::test]
async fn test_failed_run_still_retires_first_instance() {
    let program = r#"(module
        (import "env" "mark" (func $mark (param i32)))
        (import "env" "exit" (func $exit (param i32)))
        (func (export "_start") (call $mark (i32.const 9)) unreachable))"#;
    let events = Events::default();
    let source = MemorySource::new("traps", wasm(program));

    let err = loader(recording_bindings(&events)).load(&source).await.unwrap_err();

    assert_eq!(err.code, codes::ENTRY_POINT_TRAPPED);
    assert_eq!(
        *events.lock().unwrap(),
        vec![
            "setup instance-1".to_string(),
            "mark instance-1 9:i32".to_string(),
            "cleanup instance-1".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_out_of_bounds_guest_log_is_memory_error() {
    let program = r#"(module
        (import "env" "log" (func $log (param i32 i32 i32)))
        (memory (export "memory") 1)
        (func (export "_start")
            (call $log (i32.const 2) (i32.const 0) (i32.const -1))))"#;
    let bindings = default_bindings(&BindingsConfig::default()).unwrap();
    let source = MemorySource::new("oversized", wasm(program));

    let mut tracker = StateTracker::new();
    let err = loader(bindings).load_tracked(&source, &mut tracker).await.unwrap_err();

    assert_eq!(err.category, ErrorCategory::Runtime);
    assert_eq!(err.code, codes::GUEST_MEMORY_ACCESS);
    assert_eq!(tracker.history()[tracker.history().len() - 2], LoaderState::Running);
}

#[tokio::test]
async fn test_second_instantiation_failure_after_completed_run() {
    // The start function traps once the host has been asked for a second
    // instance
    let program = r#"(module
        (import "env" "next_instance" (func $next (result i32)))
        (func $init
            (if (i32.gt_u (call $next) (i32.const 1)) (then unreachable)))
        (start $init)
        (func (export "_start")))"#;
    let created = Arc::new(AtomicU32::new(0));
    let bindings = {
        let created = created.clone();
        HostBuilder::new()
            .with_function(
                "env",
                "next_instance",
                FuncSignature::new([], [ValueType::I32]),
                move |_, _| {
                    let count = created.fetch_add(1, Ordering::SeqCst) + 1;
                    Ok(vec![Value::I32(count as i32)])
                },
            )
            .build()
            .unwrap()
    };
    let source = MemorySource::new("once", wasm(program));

    let mut tracker = StateTracker::new();
    let err = loader(bindings).load_tracked(&source, &mut tracker).await.unwrap_err();

    assert_eq!(err.category, ErrorCategory::Link);
    assert_eq!(err.code, codes::INSTANTIATION_FAILED);
    assert!(err.message.contains("instance 2"), "{err}");
    assert_eq!(created.load(Ordering::SeqCst), 2);
    assert_eq!(
        tracker.history(),
        [
            LoaderState::Idle,
            LoaderState::Fetching,
            LoaderState::Compiling,
            LoaderState::Instantiated1,
            LoaderState::Running,
            LoaderState::Completed,
            LoaderState::Failed,
        ]
    );
}

#[tokio::test]
async fn test_imported_memory_and_global_per_instance() {
    let program = r#"(module
        (import "env" "memory" (memory 1))
        (import "env" "runs" (global $runs (mut i32)))
        (export "memory" (memory 0))
        (func (export "_start")
            (global.set $runs (i32.add (global.get $runs) (i32.const 1)))
            (i32.store8 (i32.const 0) (i32.const 7)))
        (func (export "runs") (result i32) (global.get $runs))
        (func (export "first_byte") (result i32) (i32.load8_u (i32.const 0))))"#;
    let bindings = HostBuilder::new()
        .with_value("env", "memory", HostValue::memory(1, None))
        .with_value("env", "runs", HostValue::mutable_global(Value::I32(0)))
        .build()
        .unwrap();
    let source = MemorySource::new("imports", wasm(program));

    let mut session = loader(bindings).load(&source).await.unwrap();

    // Instance 2 gets its own memory and global, untouched by the run
    assert_eq!(session.call("runs", &[]).await.unwrap(), vec![Value::I32(0)]);
    assert_eq!(session.call("first_byte", &[]).await.unwrap(), vec![Value::I32(0)]);
    let imports: Vec<_> = session.module().imports().iter().map(ToString::to_string).collect();
    assert_eq!(imports, vec!["env.memory: memory", "env.runs: global"]);
}

#[tokio::test]
async fn test_unbound_memory_import_fails_at_link() {
    let program = r#"(module (import "env" "memory" (memory 1)) (func (export "_start")))"#;
    let source = MemorySource::new("imports", wasm(program));

    let err = loader(HostBindings::empty()).load(&source).await.unwrap_err();
    assert_eq!(err.code, codes::MISSING_IMPORT);
    assert!(err.message.contains("env.memory"), "{err}");
}

#[tokio::test]
async fn test_missing_entry_point() {
    let source = MemorySource::new("library", wasm(r#"(module (func (export "main")))"#));
    let err = loader(HostBindings::empty()).load(&source).await.unwrap_err();

    assert_eq!(err.code, codes::ENTRY_POINT_NOT_FOUND);
    assert!(err.message.contains("_start"));
}

#[tokio::test]
async fn test_custom_entry_point() {
    let source = MemorySource::new("library", wasm(r#"(module (func (export "main")))"#));
    let loader = Loader::new(
        LoaderConfig::default(),
        EntryPointBridge::new(HostBindings::empty(), "main"),
    )
    .unwrap();

    let session = loader.load(&source).await.unwrap();
    assert_eq!(session.outcome(), RunOutcome::Returned);
}

#[tokio::test]
async fn test_forced_streaming_on_buffered_source() {
    let source = MemorySource::new("program", wasm(PROGRAM)).non_streaming();
    let loader = loader(HostBindings::empty())
        .with_strategy_preference(StrategyPreference::Streaming);

    let err = loader.load(&source).await.unwrap_err();
    assert_eq!(err.code, codes::STRATEGY_UNAVAILABLE);
    assert_eq!(source.open_count(), 0);
}

#[tokio::test]
async fn test_guest_logging_during_run() {
    let program = r#"(module
        (import "env" "log" (func $log (param i32 i32 i32)))
        (memory (export "memory") 1)
        (data (i32.const 0) "booting")
        (func (export "_start")
            (call $log (i32.const 2) (i32.const 0) (i32.const 7))))"#;

    let received = Arc::new(Mutex::new(Vec::new()));
    let mut builder = HostBuilder::new().with_guest_logging("env");
    {
        let received = received.clone();
        builder.registry_mut().register_log_handler(move |op| received.lock().unwrap().push(op));
    }
    let source = MemorySource::new("logs", wasm(program));
    loader(builder.build().unwrap()).load(&source).await.unwrap();

    assert_eq!(
        *received.lock().unwrap(),
        vec![LogOperation::with_source(LogLevel::Info, "booting", "instance-1")]
    );
}

#[tokio::test]
async fn test_inspect_compiles_without_running() {
    let events = Events::default();
    let loader = loader(recording_bindings(&events));
    let source = MemorySource::new("program", wasm(PROGRAM));

    let module = loader.inspect(&source).await.unwrap();
    let imports: Vec<_> = module.imports().iter().map(ToString::to_string).collect();
    assert_eq!(imports, vec!["env.mark: func (i32) -> ()", "env.exit: func (i32) -> ()"]);
    assert_eq!(module.digest_hex().len(), 64);
    assert!(events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_session_call_errors() {
    let events = Events::default();
    let source = MemorySource::new("program", wasm(PROGRAM));
    let mut session = loader(recording_bindings(&events)).load(&source).await.unwrap();

    let err = session.call("missing", &[]).await.unwrap_err();
    assert_eq!(err.code, codes::EXPORT_NOT_FOUND);

    let err = session.call("add", &[Value::I64(1)]).await.unwrap_err();
    assert_eq!(err.code, codes::ARGUMENT_MISMATCH);
}
