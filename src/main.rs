use dvecsim::{QReg, SimResult};
use std::process::ExitCode;
use std::time::Instant;

fn main() -> ExitCode {
    let Some(arg) = std::env::args().nth(1) else {
        eprintln!("Usage: dvecsim <n_qubits>");
        return ExitCode::FAILURE;
    };
    let n: usize = match arg.parse() {
        Ok(n) => n,
        Err(_) => {
            eprintln!("Invalid qubit count '{arg}': expected a positive integer");
            return ExitCode::FAILURE;
        }
    };

    match run(n) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(n: usize) -> SimResult<()> {
    println!("dvecsim - dense state-vector gate simulator\n");

    let t0 = Instant::now();
    let q = QReg::zero(n)?;
    let setup = t0.elapsed();

    // GHZ preparation: H on qubit 0, then a CNOT chain up the register
    let t0 = Instant::now();
    let mut q = q.h(0)?;
    for i in 0..n - 1 {
        q = q.cnot(i, i + 1)?;
    }
    let gates = t0.elapsed();

    println!(
        "{:2} qubits ({:>8} amps): setup {:>8.2?}, gates {:>8.2?} (H + {} CNOTs)",
        n,
        q.dim(),
        setup,
        gates,
        n - 1,
    );
    println!("state = {q}");

    // Full amplitude dump for registers small enough to read
    if q.dim() <= 32 {
        println!();
        for (i, amp) in q.amplitudes().iter().enumerate() {
            println!("{i:>3}: real {:+.6}  imag {:+.6}", amp.re, amp.im);
        }
    }
    Ok(())
}
