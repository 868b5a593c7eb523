#![deny(unused_must_use)]

#[macro_use]
extern crate log;

use clap;

use rusty_envelope::*;
use rusty_envelope::storage::{self, KeyFiles};

fn passphrase_arg<'a, 'b>() -> clap::Arg<'a, 'b> {
    clap::Arg::with_name("passphrase").long("passphrase")
        .help("Prompt for a passphrase protecting the private key PEM")
}

fn legacy_arg<'a, 'b>() -> clap::Arg<'a, 'b> {
    clap::Arg::with_name("legacy").long("legacy")
        .help("Use SHA-1 OAEP and the 3-byte length prefix of older envelopes")
}

fn key_arg<'a, 'b>() -> clap::Arg<'a, 'b> {
    clap::Arg::with_name("key").long("key")
        .help("Key file")
        .required(true)
        .takes_value(true)
}

fn algorithm_arg<'a, 'b>(values: &'static [&'static str]) -> clap::Arg<'a, 'b> {
    clap::Arg::with_name("algorithm").long("algorithm")
        .help("Key algorithm")
        .possible_values(values)
        .default_value(values[0])
        .takes_value(true)
}

fn input_output<'a, 'b>(command: clap::App<'a, 'b>) -> clap::App<'a, 'b> {
    command
        .arg(clap::Arg::with_name("input").help("Input file").required(true))
        .arg(clap::Arg::with_name("output").help("Output file").required(true))
}

fn read_passphrase(args: &clap::ArgMatches, prompt: &str) -> Result<Option<Vec<u8>>, CryptoError> {
    if !args.is_present("passphrase") {
        return Ok(None);
    }
    let passphrase = rpassword::read_password_from_tty(Some(prompt))?;
    Ok(Some(passphrase.into_bytes()))
}

fn envelope_options(args: &clap::ArgMatches) -> EnvelopeOptions {
    if args.is_present("legacy") {
        EnvelopeOptions::legacy()
    } else {
        EnvelopeOptions::default()
    }
}

fn load_cipher(args: &clap::ArgMatches) -> Result<Box<dyn Encryption>, CryptoError> {
    let key = args.value_of("key").unwrap_or_default();
    match args.value_of("algorithm") {
        Some("aes") => Ok(Box::new(AesCipher::load_from(key)?)),
        _ => {
            let passphrase = read_passphrase(args, "Private key passphrase: ")?;
            let cipher = RsaCipher::load_from(key, passphrase.as_ref().map(Vec::as_slice))?
                .with_options(envelope_options(args));
            Ok(Box::new(cipher))
        },
    }
}

fn generate(args: &clap::ArgMatches) -> Result<(), CryptoError> {
    let key_files = KeyFiles::new(args.value_of("directory").unwrap_or_default());
    key_files.create_dir()?;
    let bits: u32 = args.value_of("bits").unwrap_or_default().parse()
        .or(Err(CryptoError::InvalidArgument("bits must be a number")))?;
    let pem = args.value_of("format") == Some("pem");
    let passphrase = read_passphrase(args, "New private key passphrase: ")?;
    let passphrase = passphrase.as_ref().map(Vec::as_slice);

    fn save<K>(key: &K, key_files: &KeyFiles, pem: bool, passphrase: Option<&[u8]>) -> Result<(), CryptoError> where K: KeyManagement {
        if pem {
            key.save_pem(key_files.private_key(), KeyType::PrivateKey, passphrase)?;
            key.save_pem(key_files.public_key(), KeyType::PublicKey, None)?;
        } else {
            key.save_key(key_files.private_key(), KeyType::PrivateKey)?;
            key.save_key(key_files.public_key(), KeyType::PublicKey)?;
        }
        Ok(())
    }

    match args.value_of("algorithm") {
        Some("aes") => AesCipher::generate()?.save_key(key_files.symmetric_key())?,
        Some("dsa") => save(&DsaSigner::generate(bits)?, &key_files, pem, passphrase)?,
        _ => save(&RsaCipher::generate(bits)?, &key_files, pem, passphrase)?,
    }
    info!("Generated keys in {:?}", key_files);
    Ok(())
}

fn encrypt(args: &clap::ArgMatches) -> Result<(), CryptoError> {
    let cipher = load_cipher(args)?;
    let input = storage::load_bytes(args.value_of("input").unwrap_or_default())?;
    let output = cipher.encrypt_from_bytes(&input)?;
    storage::save_bytes(args.value_of("output").unwrap_or_default(), &output)?;
    info!("Encrypted {} bytes", input.len());
    Ok(())
}

fn decrypt(args: &clap::ArgMatches) -> Result<(), CryptoError> {
    let cipher = load_cipher(args)?;
    let input = storage::load_bytes(args.value_of("input").unwrap_or_default())?;
    let output = cipher.decrypt_to_bytes(&input)?;
    storage::save_bytes(args.value_of("output").unwrap_or_default(), &output)?;
    info!("Decrypted {} bytes", output.len());
    Ok(())
}

fn sign(args: &clap::ArgMatches) -> Result<(), CryptoError> {
    let passphrase = read_passphrase(args, "Private key passphrase: ")?;
    let signer = DsaSigner::load_from(args.value_of("key").unwrap_or_default(), passphrase.as_ref().map(Vec::as_slice))?;
    let message = storage::load_bytes(args.value_of("input").unwrap_or_default())?;
    let signature = signer.sign(&message)?;
    println!("{}", hex::encode(signature));
    Ok(())
}

fn verify(args: &clap::ArgMatches) -> Result<bool, CryptoError> {
    let signer = DsaSigner::load_from(args.value_of("key").unwrap_or_default(), None)?;
    let message = storage::load_bytes(args.value_of("input").unwrap_or_default())?;
    let signature = match hex::decode(args.value_of("signature").unwrap_or_default().trim()) {
        Ok(signature) => signature,
        Err(_) => return Ok(false),
    };
    Ok(signer.verify(&message, &signature))
}

fn main() {
    env_logger::from_env(env_logger::Env::default().default_filter_or("rusty_envelope=info")).init();

    let app = clap::App::new("Rusty Envelope").version(env!("CARGO_PKG_VERSION"))
        .setting(clap::AppSettings::SubcommandRequiredElseHelp)
        .subcommand(clap::SubCommand::with_name("generate")
            .about("Generate a key into a key directory")
            .arg(clap::Arg::with_name("directory").help("Key directory").required(true))
            .arg(algorithm_arg(&["rsa", "dsa", "aes"]))
            .arg(clap::Arg::with_name("bits").long("bits")
                .help("Asymmetric key size")
                .default_value("2048")
                .takes_value(true))
            .arg(clap::Arg::with_name("format").long("format")
                .help("Asymmetric key file format")
                .possible_values(&["pem", "parameters"])
                .default_value("pem")
                .takes_value(true))
            .arg(passphrase_arg()))
        .subcommand(input_output(clap::SubCommand::with_name("encrypt")
            .about("Encrypt a file")
            .arg(key_arg())
            .arg(algorithm_arg(&["rsa", "aes"]))
            .arg(legacy_arg())))
        .subcommand(input_output(clap::SubCommand::with_name("decrypt")
            .about("Decrypt a file")
            .arg(key_arg())
            .arg(algorithm_arg(&["rsa", "aes"]))
            .arg(legacy_arg())
            .arg(passphrase_arg())))
        .subcommand(clap::SubCommand::with_name("sign")
            .about("Print a hex DSA signature of a file")
            .arg(key_arg())
            .arg(clap::Arg::with_name("input").help("Input file").required(true))
            .arg(passphrase_arg()))
        .subcommand(clap::SubCommand::with_name("verify")
            .about("Verify a hex DSA signature of a file")
            .arg(key_arg())
            .arg(clap::Arg::with_name("input").help("Input file").required(true))
            .arg(clap::Arg::with_name("signature").help("Hex signature").required(true)));
    let args = app.get_matches();

    let result = match args.subcommand() {
        ("generate", Some(args)) => generate(args),
        ("encrypt", Some(args)) => encrypt(args),
        ("decrypt", Some(args)) => decrypt(args),
        ("sign", Some(args)) => sign(args),
        ("verify", Some(args)) => verify(args).map(|verified| {
            if verified {
                info!("Signature verified");
            } else {
                error!("Signature does not match");
                std::process::exit(2);
            }
        }),
        _ => unreachable!("subcommand required"),
    };
    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}
