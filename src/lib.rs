// dvecsim - dense state-vector quantum gate simulator

use ndarray::{array, Array1, Array2, ArrayView1};
use num_complex::Complex64;
use rayon::prelude::*;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

// ---- Thread-safe pointer wrapper for parallel mutation ----

/// Wrapper around a raw pointer that is Send+Sync.
/// SAFETY: Caller must ensure no two threads access the same index.
#[derive(Copy, Clone)]
struct SendPtr<T>(*mut T);
unsafe impl<T> Send for SendPtr<T> {}
unsafe impl<T> Sync for SendPtr<T> {}

impl<T: Copy> SendPtr<T> {
    #[inline]
    unsafe fn read(&self, i: usize) -> T {
        unsafe { *self.0.add(i) }
    }
    #[inline]
    unsafe fn write(&self, i: usize, val: T) {
        unsafe { *self.0.add(i) = val; }
    }
}

// ---- Complex Constants ----

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);
const NEG1: Complex64 = Complex64::new(-1.0, 0.0);
const IM: Complex64 = Complex64::new(0.0, 1.0);
const NEG_IM: Complex64 = Complex64::new(0.0, -1.0);
const S2: Complex64 = Complex64::new(std::f64::consts::FRAC_1_SQRT_2, 0.0);
const NEG_S2: Complex64 = Complex64::new(-std::f64::consts::FRAC_1_SQRT_2, 0.0);

// ---- Utility Functions ----

/// Flip bit `b` in index `i` using XOR.
pub fn conjugate_index(i: usize, b: usize) -> usize {
    i ^ (1 << b)
}

// ---- Errors ----

/// Errors raised by register construction and gate application.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    #[error("register must contain at least one qubit")]
    EmptyRegister,
    #[error("cannot address a {n}-qubit register on this platform")]
    TooManyQubits { n: usize },
    #[error("not enough memory to allocate {dim} amplitudes")]
    OutOfMemory { dim: usize },
    #[error("invalid qubit {qubit}. Must be in [0, {n})")]
    QubitOutOfRange { qubit: usize, n: usize },
    #[error("control and target must be different qubits")]
    ControlEqualsTarget { qubit: usize },
}

pub type SimResult<T> = Result<T, SimError>;

// ---- Gate Matrices ----

pub static X_GATE: LazyLock<Array2<Complex64>> = LazyLock::new(|| {
    array![[ZERO, ONE], [ONE, ZERO]]
});

pub static Y_GATE: LazyLock<Array2<Complex64>> = LazyLock::new(|| {
    array![[ZERO, NEG_IM], [IM, ZERO]]
});

pub static Z_GATE: LazyLock<Array2<Complex64>> = LazyLock::new(|| {
    array![[ONE, ZERO], [ZERO, NEG1]]
});

pub static H_GATE: LazyLock<Array2<Complex64>> = LazyLock::new(|| {
    array![[S2, S2], [S2, NEG_S2]]
});

// ---- Formatting ----

/// Round to `n` significant figures to eliminate floating-point ULP noise.
fn round_sigfigs(x: f64, n: i32) -> f64 {
    if x == 0.0 {
        return 0.0;
    }
    let d = x.abs().log10().ceil() as i32;
    let power = 10f64.powi(n - d);
    (x * power).round() / power
}

/// Format a float to always include a decimal point.
fn format_real(x: f64) -> String {
    let x = round_sigfigs(x, 15);
    let s = format!("{}", x);
    if !s.contains('.') && !s.contains('e') && !s.contains('E') {
        format!("{s}.0")
    } else {
        s
    }
}

/// Format a complex coefficient for display.
/// Returns just the real part if purely real, otherwise the full complex number.
fn qcoef(a: Complex64) -> String {
    let re = round_sigfigs(a.re, 15);
    let im = round_sigfigs(a.im, 15);
    if im.abs() < 1e-8 {
        format_real(re)
    } else {
        format!("{}+{}i", format_real(re), format_real(im))
    }
}

/// Format a single term of a quantum state as "coef|binary>".
fn qterm(i: usize, qi: Complex64, n: usize) -> String {
    format!("{}|{:0>width$b}>", qcoef(qi), i, width = n)
}

// ---- Quantum Register ----

/// An n-qubit register holding 2^n complex amplitudes. Basis index `i`
/// gives qubit k the value of bit k of `i` (bit 0 = qubit 0).
#[derive(Clone, Debug)]
pub struct QReg {
    pub v: Array1<Complex64>,
    pub n: usize,
}

impl QReg {
    /// Create an `n`-qubit register in the all-zeros basis state |00..0>.
    ///
    /// Rejects `n == 0` and any `n` whose 2^n amplitudes cannot be
    /// addressed or allocated. Storage is reserved up front, so a failed
    /// construction never yields a partially sized register.
    pub fn zero(n: usize) -> SimResult<Self> {
        if n == 0 {
            return Err(SimError::EmptyRegister);
        }
        if n >= usize::BITS as usize {
            return Err(SimError::TooManyQubits { n });
        }
        let dim = 1usize << n;
        let mut amps = Vec::new();
        amps.try_reserve_exact(dim)
            .map_err(|_| SimError::OutOfMemory { dim })?;
        amps.resize(dim, ZERO);
        amps[0] = ONE;
        Ok(QReg {
            v: Array1::from_vec(amps),
            n,
        })
    }

    /// Number of amplitudes (2^n).
    pub fn dim(&self) -> usize {
        self.v.len()
    }

    /// Read-only view of the amplitudes, ordered by basis index.
    pub fn amplitudes(&self) -> ArrayView1<'_, Complex64> {
        self.v.view()
    }

    /// Calculate the L2 norm of the state vector.
    pub fn norm(&self) -> f64 {
        self.v.iter().map(|x| x.norm_sqr()).sum::<f64>().sqrt()
    }

    /// Return string representation of significant terms in the quantum state.
    pub fn terms(&self) -> String {
        self.v
            .iter()
            .enumerate()
            .filter(|(_, qi)| qi.norm() > 1e-8)
            .map(|(i, &qi)| qterm(i, qi, self.n))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Apply a single-qubit gate matrix to the target qubit.
    ///
    /// Pairs each index where the target bit is 0 with its partner where
    /// the bit is 1 and applies `m` to every pair in place.
    pub fn apply1q(&mut self, m: &Array2<Complex64>, target: usize) -> SimResult<&mut Self> {
        if target >= self.n {
            return Err(SimError::QubitOutOfRange {
                qubit: target,
                n: self.n,
            });
        }
        let m00 = m[[0, 0]];
        let m01 = m[[0, 1]];
        let m10 = m[[1, 0]];
        let m11 = m[[1, 1]];
        let len = self.v.len();
        let ptr = SendPtr(self.v.as_mut_ptr());
        // SAFETY: Each (i, j) pair is unique and non-overlapping.
        // For target bit b, pairs are (i, i|(1<<b)) for all i where bit b is 0.
        // No two iterations touch the same array element.
        (0..len).into_par_iter().for_each(move |i| {
            let j = conjugate_index(i, target);
            if i > j {
                return;
            }
            unsafe {
                let qi = ptr.read(i);
                let qj = ptr.read(j);
                if qi.norm() + qj.norm() < 1e-8 {
                    return;
                }
                ptr.write(i, m00 * qi + m01 * qj);
                ptr.write(j, m10 * qi + m11 * qj);
            }
        });
        Ok(self)
    }

    /// Apply a controlled-NOT: flip the target qubit wherever the control
    /// qubit reads 1.
    ///
    /// A pure permutation of amplitudes: every index `i` with the control
    /// bit set is swapped with `i ^ (1 << target)`, and the `j > i` guard
    /// performs each unordered swap exactly once. Indices with the control
    /// bit clear are untouched.
    pub fn apply_cnot(&mut self, control: usize, target: usize) -> SimResult<&mut Self> {
        if control >= self.n {
            return Err(SimError::QubitOutOfRange {
                qubit: control,
                n: self.n,
            });
        }
        if target >= self.n {
            return Err(SimError::QubitOutOfRange {
                qubit: target,
                n: self.n,
            });
        }
        if control == target {
            return Err(SimError::ControlEqualsTarget { qubit: control });
        }
        let c_bit = 1usize << control;
        let len = self.v.len();
        let ptr = SendPtr(self.v.as_mut_ptr());
        // SAFETY: control != target, so flipping the target bit preserves
        // the control bit and both ends of a swap pass the c_bit filter.
        // The j > i guard admits exactly one iteration per unordered pair.
        (0..len).into_par_iter().for_each(move |i| {
            if i & c_bit == 0 {
                return;
            }
            let j = conjugate_index(i, target);
            if j <= i {
                return;
            }
            unsafe {
                let qi = ptr.read(i);
                ptr.write(i, ptr.read(j));
                ptr.write(j, qi);
            }
        });
        Ok(self)
    }

    /// Check if this quantum state is close to another.
    pub fn isclose(&self, other: &QReg) -> bool {
        if self.v.len() != other.v.len() {
            return false;
        }
        self.v
            .iter()
            .zip(other.v.iter())
            .all(|(a, b)| (a - b).norm() < 1e-5)
    }

    /// Check if this quantum state is close to a slice of f64 values (treated as real).
    pub fn isclose_slice(&self, other: &[f64]) -> bool {
        if self.v.len() != other.len() {
            return false;
        }
        self.v
            .iter()
            .zip(other.iter())
            .all(|(a, b)| (a - b).norm() < 1e-5)
    }

    // ---- Gate methods (consume self for chaining) ----

    /// Apply Pauli-X (NOT) gate to target qubit.
    pub fn x(mut self, target: usize) -> SimResult<Self> {
        self.apply1q(&X_GATE, target)?;
        Ok(self)
    }

    /// Apply Pauli-Y gate to target qubit.
    pub fn y(mut self, target: usize) -> SimResult<Self> {
        self.apply1q(&Y_GATE, target)?;
        Ok(self)
    }

    /// Apply Pauli-Z gate to target qubit.
    pub fn z(mut self, target: usize) -> SimResult<Self> {
        self.apply1q(&Z_GATE, target)?;
        Ok(self)
    }

    /// Apply Hadamard gate to target qubit.
    pub fn h(mut self, target: usize) -> SimResult<Self> {
        self.apply1q(&H_GATE, target)?;
        Ok(self)
    }

    /// Apply controlled-NOT gate.
    pub fn cnot(mut self, control: usize, target: usize) -> SimResult<Self> {
        self.apply_cnot(control, target)?;
        Ok(self)
    }
}

impl fmt::Display for QReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.terms())
    }
}

// ---- Python Bindings ----

#[cfg(feature = "pyo3")]
mod python;

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_1_SQRT_2;

    fn reg(n: usize) -> QReg {
        QReg::zero(n).expect("allocation of a small register")
    }

    // -- Utility tests --

    #[test]
    fn test_conjugate_index() {
        assert_eq!(conjugate_index(0, 0), 1); // |0> -> |1>
        assert_eq!(conjugate_index(1, 0), 0); // |1> -> |0>
        assert_eq!(conjugate_index(2, 1), 0); // |10> -> |00>
    }

    // -- Construction tests --

    #[test]
    fn test_zero_one_qubit() {
        let q = reg(1);
        assert_eq!(q.n, 1);
        assert_eq!(q.dim(), 2);
        assert_eq!(q.v[0], Complex64::new(1.0, 0.0));
        assert_eq!(q.v[1], Complex64::new(0.0, 0.0));
        assert_eq!(q.to_string(), "1.0|0>");
    }

    #[test]
    fn test_zero_three_qubits() {
        let q = reg(3);
        assert_eq!(q.dim(), 8);
        assert_eq!(q.v[0], Complex64::new(1.0, 0.0));
        assert!(q.v.iter().skip(1).all(|&a| a == Complex64::new(0.0, 0.0)));
        assert_eq!(q.to_string(), "1.0|000>");
    }

    #[test]
    fn test_zero_rejects_empty() {
        assert_eq!(QReg::zero(0).unwrap_err(), SimError::EmptyRegister);
    }

    #[test]
    fn test_zero_rejects_unaddressable() {
        let n = usize::BITS as usize;
        assert_eq!(QReg::zero(n).unwrap_err(), SimError::TooManyQubits { n });
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_zero_rejects_unallocatable() {
        // 2^60 amplitudes is 2^64 bytes; the reservation fails up front
        // without touching that much memory.
        assert_eq!(
            QReg::zero(60).unwrap_err(),
            SimError::OutOfMemory { dim: 1 << 60 }
        );
    }

    // -- Single-qubit gate tests --

    #[test]
    fn test_x_gate() {
        let q = reg(1).x(0).unwrap();
        assert!(q.isclose_slice(&[0.0, 1.0]));
        assert_eq!(q.to_string(), "1.0|1>");
        assert_eq!(reg(2).x(0).unwrap().to_string(), "1.0|01>");
        assert_eq!(reg(2).x(1).unwrap().to_string(), "1.0|10>");
    }

    #[test]
    fn test_h_gate() {
        // H|0> = (|0> + |1>) / sqrt(2)
        let q = reg(1).h(0).unwrap();
        assert!(q.isclose_slice(&[FRAC_1_SQRT_2, FRAC_1_SQRT_2]));
        // H|1> = (|0> - |1>) / sqrt(2)
        let q = reg(1).x(0).unwrap().h(0).unwrap();
        assert!(q.isclose_slice(&[FRAC_1_SQRT_2, -FRAC_1_SQRT_2]));
    }

    #[test]
    fn test_y_gate() {
        // Y|0> = i|1>
        let q = reg(1).y(0).unwrap();
        assert!(q.v[0].norm() < 1e-8);
        assert!((q.v[1] - Complex64::new(0.0, 1.0)).norm() < 1e-5);

        // Y|1> = -i|0>
        let q = reg(1).x(0).unwrap().y(0).unwrap();
        assert!((q.v[0] - Complex64::new(0.0, -1.0)).norm() < 1e-5);
        assert!(q.v[1].norm() < 1e-8);
    }

    #[test]
    fn test_z_gate() {
        // Z|0> = |0>
        assert_eq!(reg(1).z(0).unwrap().to_string(), "1.0|0>");
        // Z|1> = -|1>
        assert_eq!(reg(1).x(0).unwrap().z(0).unwrap().to_string(), "-1.0|1>");
    }

    #[test]
    fn test_apply1q_in_place() {
        let mut q = reg(1);
        q.apply1q(&X_GATE, 0).unwrap();
        assert!(q.isclose_slice(&[0.0, 1.0]));
    }

    // -- Involutions: each gate undoes itself --

    #[test]
    fn test_involutions_on_basis() {
        assert!(reg(1).x(0).unwrap().x(0).unwrap().isclose(&reg(1)));
        assert!(reg(1).y(0).unwrap().y(0).unwrap().isclose(&reg(1)));
        assert!(reg(1).z(0).unwrap().z(0).unwrap().isclose(&reg(1)));
        assert!(reg(1).h(0).unwrap().h(0).unwrap().isclose(&reg(1)));
    }

    #[test]
    fn test_involutions_on_superposition() {
        let q = reg(2).h(0).unwrap().cnot(0, 1).unwrap();
        assert!(q.clone().x(1).unwrap().x(1).unwrap().isclose(&q));
        assert!(q.clone().y(1).unwrap().y(1).unwrap().isclose(&q));
        assert!(q.clone().z(1).unwrap().z(1).unwrap().isclose(&q));
        assert!(q.clone().h(1).unwrap().h(1).unwrap().isclose(&q));
        assert!(q.clone().cnot(0, 1).unwrap().cnot(0, 1).unwrap().isclose(&q));
    }

    // -- CNOT on all 2-qubit basis states --

    #[test]
    fn test_cnot_all_basis() {
        // CNOT(control=0, target=1): flips target when control is 1
        assert_eq!(reg(2).cnot(0, 1).unwrap().to_string(), "1.0|00>");
        assert_eq!(reg(2).x(0).unwrap().cnot(0, 1).unwrap().to_string(), "1.0|11>");
        assert_eq!(reg(2).x(1).unwrap().cnot(0, 1).unwrap().to_string(), "1.0|10>");
        assert_eq!(
            reg(2).x(0).unwrap().x(1).unwrap().cnot(0, 1).unwrap().to_string(),
            "1.0|01>"
        );
    }

    // -- Bell state test --

    #[test]
    fn test_bell_state() {
        let bell = reg(2).h(0).unwrap().cnot(0, 1).unwrap();
        // Bell state |00> + |11> with equal amplitudes
        assert!(bell.isclose_slice(&[FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2]));
    }

    // -- GHZ state (3-qubit entanglement) --

    #[test]
    fn test_ghz_state() {
        let ghz = reg(3).h(0).unwrap().cnot(0, 1).unwrap().cnot(1, 2).unwrap();
        // GHZ = (|000> + |111>) / sqrt(2)
        assert!(ghz.isclose_slice(&[
            FRAC_1_SQRT_2,
            0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
            FRAC_1_SQRT_2
        ]));
    }

    // -- Normalization invariant over a mixed gate sequence --

    #[test]
    fn test_norm_preserved_by_gate_sequence() {
        let q = reg(3)
            .h(0).unwrap()
            .y(1).unwrap()
            .cnot(0, 2).unwrap()
            .z(2).unwrap()
            .h(1).unwrap()
            .x(2).unwrap()
            .cnot(2, 0).unwrap();
        assert!((q.norm() - 1.0).abs() < 1e-9);
    }

    // -- Parameter validation --

    #[test]
    fn test_rejects_out_of_range_qubit() {
        assert_eq!(
            reg(2).h(2).unwrap_err(),
            SimError::QubitOutOfRange { qubit: 2, n: 2 }
        );
        assert_eq!(
            reg(2).cnot(0, 5).unwrap_err(),
            SimError::QubitOutOfRange { qubit: 5, n: 2 }
        );
        assert_eq!(
            reg(2).cnot(3, 0).unwrap_err(),
            SimError::QubitOutOfRange { qubit: 3, n: 2 }
        );
    }

    #[test]
    fn test_rejects_control_equals_target() {
        assert_eq!(
            reg(2).cnot(1, 1).unwrap_err(),
            SimError::ControlEqualsTarget { qubit: 1 }
        );
    }

    #[test]
    fn test_rejection_leaves_state_untouched() {
        let mut q = reg(2).h(0).unwrap();
        let before = q.clone();
        assert!(q.apply_cnot(0, 7).is_err());
        assert!(q.isclose(&before));
    }

    // -- Read access --

    #[test]
    fn test_amplitudes_view() {
        let q = reg(2).x(1).unwrap();
        let amps = q.amplitudes();
        assert_eq!(amps.len(), 4);
        assert!((amps[2] - Complex64::new(1.0, 0.0)).norm() < 1e-12);
    }
}
