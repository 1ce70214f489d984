// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Modbus RTU slave engine.

use crate::{
    Address, Coils, DeviceFingerprint, Error, Exception, ExceptionResponse, FunctionCode, Header,
    Quantity, Registers, Request, RequestAdu, Response, ResponseAdu, ResponsePdu, SlaveId, Stats,
    Word, Words,
    rtu::{self, server::encode_response},
};

/// Largest register quantity a single request may address.
pub const MAX_REGISTER_QUANTITY: Quantity = 0x7B;

/// A Modbus RTU slave serving an in-memory register image.
///
/// Requests are processed one at a time, the caller provides the
/// buffer the response is written to. Share a `Server` between
/// threads by wrapping it in a mutex.
#[derive(Debug, Clone)]
pub struct Server {
    slave: SlaveId,
    registers: Registers,
}

impl Server {
    /// Create a slave listening to the address `slave`.
    #[must_use]
    pub fn new(slave: SlaveId, source: &impl DeviceFingerprint) -> Self {
        Self {
            slave,
            registers: Registers::new(&source.fingerprint()),
        }
    }

    /// The address this slave responds to.
    #[must_use]
    pub const fn slave(&self) -> SlaveId {
        self.slave
    }

    #[must_use]
    pub const fn registers(&self) -> &Registers {
        &self.registers
    }

    pub const fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    /// Current values of the usage counters.
    #[must_use]
    pub const fn stats(&self) -> Stats {
        self.registers.stats()
    }

    /// `true` if the frame is addressed to this slave and its CRC is valid.
    #[must_use]
    pub fn validate(&self, frame: &[u8]) -> bool {
        rtu::extract_frame(self.slave, frame).is_ok()
    }

    /// Process a single request frame.
    ///
    /// The sealed response is written to `buf` and its length is returned.
    /// A length of `0` means that nothing must be transmitted, either
    /// because the frame is addressed to another slave or it is corrupted.
    /// Invalid requests are answered with an exception response.
    ///
    /// The usage counters are updated in any case. The only error is
    /// [`Error::BufferSize`] if `buf` cannot hold the response,
    /// [`rtu::MAX_FRAME_LEN`] bytes are always sufficient.
    pub fn process(&mut self, frame: &[u8], buf: &mut [u8]) -> Result<usize, Error> {
        let res = self.respond(frame, buf);
        let sent = res.as_ref().map_or(0, |len| *len);
        self.registers.record_request(frame.len(), sent);
        res
    }

    fn respond(&mut self, frame: &[u8], buf: &mut [u8]) -> Result<usize, Error> {
        if !self.validate(frame) {
            return Ok(0);
        }
        let len = self.dispatch(frame, buf)?;
        rtu::seal(&mut buf[..len])?;
        Ok(len)
    }

    /// Execute a request and write the unsealed response into `buf`.
    ///
    /// The frame is expected to be validated, see [`Server::validate`].
    /// The two trailing CRC bytes of the response are left zeroed.
    /// Returns `0` if the frame is not a request for this slave.
    pub fn dispatch(&mut self, frame: &[u8], buf: &mut [u8]) -> Result<usize, Error> {
        let adu = match rtu::server::decode_request(self.slave, frame) {
            Ok(adu) => adu,
            Err(err) => {
                #[cfg(feature = "log")]
                log::debug!("Dropping frame: {err}");
                #[cfg(not(feature = "log"))]
                let _ = err;
                return Ok(0);
            }
        };
        let hdr = Header { slave: self.slave };
        let pdu = match adu {
            Ok(RequestAdu { pdu, .. }) => self.handle(pdu),
            Err(ex) => Err(ex),
        };
        #[cfg(feature = "log")]
        if let Err(ExceptionResponse {
            function,
            exception,
        }) = pdu
        {
            log::debug!("Answering function {function} with exception: {exception}");
        }
        let adu = ResponseAdu {
            hdr,
            pdu: ResponsePdu(pdu),
        };
        encode_response(adu, buf).inspect_err(|_err| {
            #[cfg(feature = "log")]
            log::warn!("Response buffer of {} byte(s) is too small", buf.len());
        })
    }

    fn handle(&mut self, req: Request<'_>) -> Result<Response<'_>, ExceptionResponse> {
        use Request as R;

        let function = FunctionCode::from(req);
        let rsp = match req {
            R::ReadCoils(addr, quantity) => self.read_coils(addr, quantity),
            R::ReadDiscreteInputs(addr, quantity) => self.read_discrete_inputs(addr, quantity),
            R::ReadHoldingRegisters(addr, quantity) => {
                self.read_holding_registers(addr, quantity)
            }
            R::ReadInputRegisters(addr, quantity) => self.read_input_registers(addr, quantity),
            R::WriteSingleCoil(addr, coil) => self.write_single_coil(addr, coil),
            R::WriteSingleRegister(addr, word) => self.write_single_register(addr, word),
            R::WriteMultipleCoils(addr, coils) => self.write_multiple_coils(addr, coils),
            R::WriteMultipleRegisters(addr, words) => self.write_multiple_registers(addr, words),
        };
        rsp.map_err(|exception| ExceptionResponse {
            function,
            exception,
        })
    }

    fn read_coils(&self, addr: Address, quantity: Quantity) -> Result<Response<'_>, Exception> {
        let coils = self
            .registers
            .coils
            .range(addr, quantity)
            .ok_or(Exception::IllegalDataAddress)?;
        Ok(Response::ReadCoils(coils))
    }

    fn read_discrete_inputs(
        &self,
        addr: Address,
        quantity: Quantity,
    ) -> Result<Response<'_>, Exception> {
        let inputs = self
            .registers
            .discrete_inputs
            .range(addr, quantity)
            .ok_or(Exception::IllegalDataAddress)?;
        Ok(Response::ReadDiscreteInputs(inputs))
    }

    fn read_holding_registers(
        &self,
        addr: Address,
        quantity: Quantity,
    ) -> Result<Response<'_>, Exception> {
        let words = self
            .registers
            .holding_registers
            .range(addr, quantity)
            .ok_or(Exception::IllegalDataAddress)?;
        Ok(Response::ReadHoldingRegisters(words))
    }

    fn read_input_registers(
        &self,
        addr: Address,
        quantity: Quantity,
    ) -> Result<Response<'_>, Exception> {
        check_register_quantity(quantity)?;
        let words = self
            .registers
            .input_registers
            .range(addr, quantity)
            .ok_or(Exception::IllegalDataAddress)?;
        Ok(Response::ReadInputRegisters(words))
    }

    fn write_single_coil(&mut self, addr: Address, coil: bool) -> Result<Response<'_>, Exception> {
        let slot = self
            .registers
            .coils
            .range_mut(addr, 1)
            .and_then(<[bool]>::first_mut)
            .ok_or(Exception::IllegalDataAddress)?;
        *slot = coil;
        Ok(Response::WriteSingleCoil(addr, coil))
    }

    fn write_single_register(
        &mut self,
        addr: Address,
        word: Word,
    ) -> Result<Response<'_>, Exception> {
        let slot = self
            .registers
            .holding_registers
            .range_mut(addr, 1)
            .and_then(<[Word]>::first_mut)
            .ok_or(Exception::IllegalDataAddress)?;
        *slot = word;
        Ok(Response::WriteSingleRegister(addr, word))
    }

    fn write_multiple_coils(
        &mut self,
        addr: Address,
        coils: Coils<'_>,
    ) -> Result<Response<'_>, Exception> {
        let quantity = quantity_of(coils.len())?;
        let slots = self
            .registers
            .coils
            .range_mut(addr, quantity)
            .ok_or(Exception::IllegalDataAddress)?;
        if !coils.is_complete() {
            return Err(Exception::IllegalDataValue);
        }
        for (slot, coil) in slots.iter_mut().zip(coils) {
            *slot = coil;
        }
        Ok(Response::WriteMultipleCoils(addr, quantity))
    }

    fn write_multiple_registers(
        &mut self,
        addr: Address,
        words: Words<'_>,
    ) -> Result<Response<'_>, Exception> {
        let quantity = quantity_of(words.len())?;
        check_register_quantity(quantity)?;
        let slots = self
            .registers
            .holding_registers
            .range_mut(addr, quantity)
            .ok_or(Exception::IllegalDataAddress)?;
        if !words.is_complete() {
            return Err(Exception::IllegalDataValue);
        }
        for (slot, word) in slots.iter_mut().zip(words) {
            *slot = word;
        }
        Ok(Response::WriteMultipleRegisters(addr, quantity))
    }
}

const fn check_register_quantity(quantity: Quantity) -> Result<(), Exception> {
    if quantity == 0 || quantity > MAX_REGISTER_QUANTITY {
        return Err(Exception::IllegalDataValue);
    }
    Ok(())
}

fn quantity_of(len: usize) -> Result<Quantity, Exception> {
    Quantity::try_from(len).map_err(|_| Exception::IllegalDataValue)
}
