// PyO3 Python bindings for dvecsim
//
// Provides:
// - zero(n) constructor for the |00..0> register
// - Gate methods: X, Y, Z, H, CNOT (uppercase, method chaining)
// - Getters: n, amplitudes, norm
// - isclose() accepting QReg or list

#![allow(non_snake_case)]

use crate::{QReg as RustQReg, SimError};
use num_complex::Complex64;
use pyo3::exceptions::{PyMemoryError, PyValueError};
use pyo3::prelude::*;

/// Map a simulator error onto the matching Python exception.
fn sim_err(e: SimError) -> PyErr {
    match e {
        SimError::OutOfMemory { .. } => PyMemoryError::new_err(e.to_string()),
        _ => PyValueError::new_err(e.to_string()),
    }
}

/// Python wrapper for QReg
#[pyclass(name = "QReg")]
pub struct PyQReg {
    inner: RustQReg,
}

#[pymethods]
impl PyQReg {
    // ---- Properties ----

    /// Number of qubits
    #[getter]
    fn n(&self) -> usize {
        self.inner.n
    }

    /// State vector amplitudes as list of complex numbers
    #[getter]
    fn amplitudes(&self) -> Vec<Complex64> {
        self.inner.v.to_vec()
    }

    /// L2 norm of the state vector
    #[getter]
    fn norm(&self) -> f64 {
        self.inner.norm()
    }

    // ---- String representations ----

    fn __str__(&self) -> String {
        self.inner.to_string()
    }

    fn __repr__(&self) -> String {
        format!("QReg({})", self.inner.terms())
    }

    fn terms(&self) -> String {
        self.inner.terms()
    }

    // ---- Single-qubit gates ----

    /// Apply Pauli-X (NOT) gate to target qubit
    fn X(slf: Py<Self>, target: usize, py: Python<'_>) -> PyResult<Py<Self>> {
        {
            let mut this = slf.borrow_mut(py);
            this.inner.apply1q(&crate::X_GATE, target).map_err(sim_err)?;
        }
        Ok(slf)
    }

    /// Apply Pauli-Y gate to target qubit
    fn Y(slf: Py<Self>, target: usize, py: Python<'_>) -> PyResult<Py<Self>> {
        {
            let mut this = slf.borrow_mut(py);
            this.inner.apply1q(&crate::Y_GATE, target).map_err(sim_err)?;
        }
        Ok(slf)
    }

    /// Apply Pauli-Z gate to target qubit
    fn Z(slf: Py<Self>, target: usize, py: Python<'_>) -> PyResult<Py<Self>> {
        {
            let mut this = slf.borrow_mut(py);
            this.inner.apply1q(&crate::Z_GATE, target).map_err(sim_err)?;
        }
        Ok(slf)
    }

    /// Apply Hadamard gate to target qubit
    fn H(slf: Py<Self>, target: usize, py: Python<'_>) -> PyResult<Py<Self>> {
        {
            let mut this = slf.borrow_mut(py);
            this.inner.apply1q(&crate::H_GATE, target).map_err(sim_err)?;
        }
        Ok(slf)
    }

    // ---- Two-qubit gates ----

    /// Apply controlled-NOT gate
    fn CNOT(slf: Py<Self>, control: usize, target: usize, py: Python<'_>) -> PyResult<Py<Self>> {
        {
            let mut this = slf.borrow_mut(py);
            this.inner.apply_cnot(control, target).map_err(sim_err)?;
        }
        Ok(slf)
    }

    // ---- Comparison ----

    /// Check if this state is close to another QReg or a list of values
    fn isclose(&self, other: &Bound<'_, PyAny>) -> PyResult<bool> {
        // Try to extract as PyQReg first
        if let Ok(other_qreg) = other.extract::<PyRef<PyQReg>>() {
            return Ok(self.inner.isclose(&other_qreg.inner));
        }

        // Try to extract as list of complex numbers
        if let Ok(complex_list) = other.extract::<Vec<Complex64>>() {
            if self.inner.v.len() != complex_list.len() {
                return Ok(false);
            }
            return Ok(self
                .inner
                .v
                .iter()
                .zip(complex_list.iter())
                .all(|(a, b)| (a - b).norm() < 1e-5));
        }

        // Try to extract as list of floats (real numbers)
        if let Ok(float_list) = other.extract::<Vec<f64>>() {
            return Ok(self.inner.isclose_slice(&float_list));
        }

        Err(PyValueError::new_err(
            "isclose() argument must be QReg or list of numbers",
        ))
    }
}

/// Create an n-qubit register in the all-zeros basis state |00..0>
///
/// Args:
///     n: Number of qubits (must be at least 1)
///
/// Returns:
///     QReg: The register with amplitude 1 on basis state 0
///
/// Raises:
///     ValueError: If n is 0 or not addressable
///     MemoryError: If 2^n amplitudes cannot be allocated
#[pyfunction]
fn zero(n: usize) -> PyResult<PyQReg> {
    Ok(PyQReg {
        inner: RustQReg::zero(n).map_err(sim_err)?,
    })
}

/// Python module definition
#[pymodule]
fn dvecsim(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyQReg>()?;
    m.add_function(wrap_pyfunction!(zero, m)?)?;
    Ok(())
}
