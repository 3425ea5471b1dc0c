use std::env;
use std::fs;

use markov::MarkovHandle;
use markov::model::tokenizer::{join, tokenize};

/// Used when no corpus file is given on the command line.
const DEFAULT_CORPUS: &str = "\
the quick brown fox jumps over the lazy dog.
the lazy dog sleeps in the warm sun.
a quick fox runs through the dark forest!
the forest is quiet in the morning.
does the dog dream of the fox?";

/// Size of the output buffer, as a foreign caller would allocate it.
const CAPACITY: usize = 8192;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging is controlled by RUST_LOG (ex. RUST_LOG=debug)
    env_logger::init();

    // Usage: markov-exemple [corpus.txt] [message...]
    let mut args = env::args().skip(1);
    let corpus = match args.next() {
        Some(path) => fs::read_to_string(&path)?,
        None => DEFAULT_CORPUS.to_owned(),
    };
    let message: Vec<String> = args.collect();
    let message = if message.is_empty() {
        "what does the lazy".to_owned()
    } else {
        message.join(" ")
    };

    // The handle goes through the C ABI, exactly like a foreign caller
    let mut model = MarkovHandle::new()?;

    // Each line is learned as a separate sequence
    let mut lines = 0;
    for line in corpus.lines().filter(|l| !l.trim().is_empty()) {
        model.learn(line.as_bytes())?;
        lines += 1;
    }
    log::info!("Learned {lines} lines");

    // Unconditioned generation
    for i in 0..5 {
        let sentence = model.speak(CAPACITY)?;
        println!("Generated sentence {}: {}", i + 1, String::from_utf8_lossy(&sentence));
    }

    // Reply: the message is tokenized the same way the model sees it
    println!("Message tokens: {}", join(&tokenize(message.as_bytes())));
    let answer = model.reply(message.as_bytes(), CAPACITY)?;
    println!("Reply: {}", String::from_utf8_lossy(&answer));

    // A buffer too small for even one token is an error, not a truncation
    match model.speak(0) {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("Tiny buffer rejected: {e}"),
    }

    // Explicit release; dropping the handle would do the same
    model.close()?;
    Ok(())
}
