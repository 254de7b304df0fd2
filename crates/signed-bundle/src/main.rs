use std::process;

fn main() {
    let exit_code = match signed_bundle::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            signed_bundle::EXIT_USAGE
        }
    };

    process::exit(exit_code);
}
