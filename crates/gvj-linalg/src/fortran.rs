#![forbid(unsafe_code)]

//! Legacy calling convention: integer status return, integer `itype` and
//! sort flag, byte selectors, and every out-parameter passed by reference.

use crate::{
    GvjRequest, GvjScalar, STATUS_INVALID_HANDLE, STATUS_INVALID_POINTER, STATUS_INVALID_VALUE,
    STATUS_SUCCESS, SolverHandle, check_arguments, gvj,
};

#[allow(clippy::too_many_arguments)]
pub fn gvj_legacy<T: GvjScalar>(
    handle: Option<&SolverHandle>,
    itype: i32,
    jobz: u8,
    uplo: u8,
    n: i32,
    a: Option<&mut [T]>,
    lda: i32,
    b: Option<&mut [T]>,
    ldb: i32,
    abstol: T::Real,
    residual: Option<&mut T::Real>,
    max_sweeps: i32,
    n_sweeps: Option<&mut i32>,
    w: Option<&mut [T::Real]>,
    esort: i32,
    info: Option<&mut i32>,
) -> i32 {
    if handle.is_none() {
        return STATUS_INVALID_HANDLE;
    }
    let sort_eig = match esort {
        0 => false,
        1 => true,
        _ => return STATUS_INVALID_VALUE,
    };
    let itype = match itype {
        1 => '1',
        2 => '2',
        3 => '3',
        _ => '?',
    };

    let request = GvjRequest {
        itype,
        jobz: char::from(jobz),
        uplo: char::from(uplo),
        n,
        a,
        lda,
        b,
        ldb,
        abstol,
        max_sweeps,
        w,
        sort_eig,
    };
    if let Err(err) = check_arguments(handle, &request) {
        return err.status_code();
    }
    let (Some(residual), Some(n_sweeps), Some(info)) = (residual, n_sweeps, info) else {
        return STATUS_INVALID_POINTER;
    };

    match gvj(handle, request) {
        Ok(outcome) => {
            *residual = outcome.residual;
            *n_sweeps = outcome.sweeps;
            *info = outcome.info;
            STATUS_SUCCESS
        }
        Err(err) => err.status_code(),
    }
}
