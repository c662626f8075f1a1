fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Client stubs for callers; server stubs are only used by the in-crate
    // mock authority in tests.
    tonic_build::configure()
        .build_client(true)
        .build_server(true)
        .compile_protos(&["../../../proto/services/auth.proto"], &["../../../proto/services/"])?;

    println!("cargo:rerun-if-changed=../../../proto/services/auth.proto");
    Ok(())
}
