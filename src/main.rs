// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::env;
use std::fs;
use std::io::Cursor;
use std::process::ExitCode;

use jpeg_baseline::color::to_rgb;
use jpeg_baseline::decode::{DecodedCoefficients, decode_coefficients};
use jpeg_baseline::enc::bmp::to_bmp;
use jpeg_baseline::error::Result;
use jpeg_baseline::idct::{Idct, IdctClipTable};

fn print_summary(coefficients: &DecodedCoefficients) {
    let frame = &coefficients.headers.frame;
    println!("Image size: {} x {}", frame.width, frame.height);
    for (i, component) in frame.components.iter().enumerate() {
        println!(
            "Component {i}: id {} sampling {}x{} quantization table {}",
            component.id, component.h_sampling, component.v_sampling, component.quantization_table
        );
    }
    println!(
        "MCUs: {} x {}, restart interval {}",
        frame.mcus_wide, frame.mcus_tall, coefficients.geometry.restart_interval
    );
    println!("Decoded blocks: {}", coefficients.blocks.len());
}

fn run(input: &str, output: Option<&str>) -> Result<()> {
    let contents = fs::read(input)?;
    let coefficients = decode_coefficients(Cursor::new(contents))?;
    print_summary(&coefficients);
    if let Some(output) = output {
        let image = to_rgb(&coefficients, &Idct::new(IdctClipTable::new()))?;
        fs::write(output, to_bmp(&image)?)?;
        println!("Wrote {output}");
    }
    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    if !(2..=3).contains(&args.len()) {
        eprintln!("Usage: {} <input.jpg> [output.bmp]", args[0]);
        return ExitCode::FAILURE;
    }
    match run(&args[1], args.get(2).map(String::as_str)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error decoding {}: {err}", args[1]);
            ExitCode::FAILURE
        }
    }
}
