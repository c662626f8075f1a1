// Build script for identity-service
// identity-service PROVIDES UserAuth; the client side lives in grpc-clients.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=../../proto/services/auth.proto");

    tonic_build::configure()
        .build_server(true)
        .build_client(false)
        .compile_protos(&["../../proto/services/auth.proto"], &["../../proto/services/"])?;

    Ok(())
}
