//! Synthesizes small but well formed core files so the parsers can be tested without
//! checking real cores into the repo. The images mimic what the kernel writes: a NOTE
//! segment with prpsinfo, NT_FILE, and auxv notes, a LOAD segment with some code, and a
//! LOAD segment holding the process startup stack.
use crate::elf::{ByteRange, Endian, Field, Layout, Word};

pub const AT_PAGESZ: u64 = 6;
pub const AT_UID: u64 = 11;
pub const AT_PLATFORM: u64 = 15;
pub const AT_HWCAP: u64 = 16;
pub const AT_CLKTCK: u64 = 17;
pub const AT_SECURE: u64 = 23;
pub const AT_RANDOM: u64 = 25;
pub const AT_EXECFN: u64 = 31;

/// fpu vme de pse tsc msr pae mce cx8 apic sep mtrr pge mca cmov pat pse36 clflush mmx
/// fxsr sse sse2 ht
pub const HWCAP: u64 = 0x178bfbff;

pub const RANDOM: [u8; 16] = [
    0x9a, 0x3c, 0x11, 0x00, 0x42, 0xe7, 0x5d, 0x08, 0xfe, 0x71, 0x2b, 0xc4, 0x00, 0x86, 0x13,
    0x5f,
];

pub struct CoreBuilder {
    word_size: usize,
    endian: Endian,
    argv: Vec<String>,
    envp: Vec<String>,
    pid: u32,
    argc: Option<u64>,
    with_argc: bool,
    with_execfn: bool,
    with_sentinel: bool,
    with_prpsinfo: bool,
    prpsinfo_padding: usize,
    extended_numbering: bool,
    note_after_load: bool,
}

/// The image along with where things ended up.
pub struct BuiltCore {
    pub bytes: Vec<u8>,
    pub num_segments: usize,
    pub execfn_addr: u64,
    pub stack_vaddr: u64,
    pub stack_offset: usize,
    pub stack_len: usize,
    pub note_offset: usize,
    pub auxv_note: ByteRange,
    pub argv: ByteRange,
    pub envp: ByteRange,
    pub platform_addr: u64,
    pub random_addr: u64,
}

impl CoreBuilder {
    pub fn new64() -> Self {
        CoreBuilder::new(8)
    }

    pub fn new32() -> Self {
        CoreBuilder::new(4)
    }

    fn new(word_size: usize) -> Self {
        CoreBuilder {
            word_size,
            endian: Endian::Little,
            argv: strings(&["prog", "a", "b"]),
            envp: strings(&["X=1"]),
            pid: 4242,
            argc: None,
            with_argc: true,
            with_execfn: true,
            with_sentinel: true,
            with_prpsinfo: true,
            prpsinfo_padding: 0,
            extended_numbering: false,
            note_after_load: false,
        }
    }

    pub fn argv(mut self, argv: &[&str]) -> Self {
        self.argv = strings(argv);
        self
    }

    pub fn envp(mut self, envp: &[&str]) -> Self {
        self.envp = strings(envp);
        self
    }

    pub fn pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    pub fn big_endian(mut self) -> Self {
        self.endian = Endian::Big;
        self
    }

    /// Stores a bogus argc instead of the real count.
    pub fn argc(mut self, argc: u64) -> Self {
        self.argc = Some(argc);
        self
    }

    /// The stack segment starts with the argv pointers.
    pub fn without_argc(mut self) -> Self {
        self.with_argc = false;
        self
    }

    /// Leaves AT_EXECFN out of the auxv note.
    pub fn without_execfn(mut self) -> Self {
        self.with_execfn = false;
        self
    }

    /// Leaves the AT_NULL pair off the end of the auxv note.
    pub fn without_sentinel(mut self) -> Self {
        self.with_sentinel = false;
        self
    }

    pub fn without_prpsinfo(mut self) -> Self {
        self.with_prpsinfo = false;
        self
    }

    /// Uses the 32-bit prpsinfo variant with 4-byte uid and gid.
    pub fn wide_ids(mut self) -> Self {
        self.prpsinfo_padding = 4;
        self
    }

    /// Sets e_phnum to PN_XNUM and stashes the count in section header [0].
    pub fn extended_numbering(mut self) -> Self {
        self.extended_numbering = true;
        self
    }

    /// Puts the NOTE program header after the LOAD headers.
    pub fn note_after_load(mut self) -> Self {
        self.note_after_load = true;
        self
    }

    pub fn build(&self) -> BuiltCore {
        let w = self.word_size;
        let layout = self.layout();
        let execfn = self.argv[0].clone();
        let platform = if w == 4 { "i686" } else { "x86_64" };

        // Lay out the stack, addresses of the strings are needed for the pointers.
        let stack_vaddr: u64 = if w == 4 { 0xbf80_0000 } else { 0x7ffc_1000_0000 };
        let lead = if self.with_argc { 3 } else { 0 }; // two junk words then argc
        let num_aux = self.auxv(0, 0, 0, true).len();
        let num_words = lead + self.argv.len() + 1 + self.envp.len() + 1 + 2 * num_aux;
        let random_off = (num_words * w).next_multiple_of(16);
        let platform_off = random_off + RANDOM.len();
        let mut off = platform_off + platform.len() + 1;
        let mut argv_addrs = Vec::new();
        for s in self.argv.iter() {
            argv_addrs.push(stack_vaddr + off as u64);
            off += s.len() + 1;
        }
        let mut envp_addrs = Vec::new();
        for s in self.envp.iter() {
            envp_addrs.push(stack_vaddr + off as u64);
            off += s.len() + 1;
        }
        let execfn_addr = stack_vaddr + off as u64;
        off += execfn.len() + 1;
        let stack_len = (off + w).next_multiple_of(16);

        let random_addr = stack_vaddr + random_off as u64;
        let platform_addr = stack_vaddr + platform_off as u64;
        let auxv = self.auxv(random_addr, platform_addr, execfn_addr, true);

        let mut stack = Out::new(self.endian, w);
        if self.with_argc {
            stack.word(0);
            stack.word(0);
            stack.word(self.argc.unwrap_or(self.argv.len() as u64));
        }
        let argv_begin = stack.len();
        argv_addrs.iter().for_each(|&a| stack.word(a));
        let argv_end = stack.len();
        stack.word(0);
        let envp_begin = stack.len();
        envp_addrs.iter().for_each(|&a| stack.word(a));
        let envp_end = stack.len();
        stack.word(0);
        for &(key, value) in auxv.iter() {
            stack.word(key);
            stack.word(value);
        }
        stack.pad(16);
        assert_eq!(stack.len(), random_off);
        stack.bytes.extend(RANDOM);
        stack.string(platform);
        self.argv.iter().for_each(|s| stack.string(s));
        self.envp.iter().for_each(|s| stack.string(s));
        stack.string(&execfn);
        stack.bytes.resize(stack_len, 0);

        // Position everything in the file.
        let num_segments = 3;
        let ph_offset = layout.ehdr_size;
        let sh_offset = ph_offset + num_segments * layout.phdr_size;
        let mut end = sh_offset;
        if self.extended_numbering {
            end += layout.shdr_size;
        }
        let note_offset = end.next_multiple_of(8);
        let (notes, auxv_desc) = self.notes(random_addr, platform_addr, execfn_addr);
        let text_offset = (note_offset + notes.len()).next_multiple_of(16);
        let text = [0xccu8; 64];
        let stack_offset = (text_offset + text.len()).next_multiple_of(16);

        let mut bytes = vec![0u8; stack_offset + stack.len()];
        bytes[note_offset..note_offset + notes.len()].copy_from_slice(&notes);
        bytes[text_offset..text_offset + text.len()].copy_from_slice(&text);
        bytes[stack_offset..].copy_from_slice(&stack.bytes);

        // ELF header
        let class = if w == 4 { 1 } else { 2 };
        let data = match self.endian {
            Endian::Little => 1,
            Endian::Big => 2,
        };
        bytes[0..7].copy_from_slice(&[0x7f, b'E', b'L', b'F', class, data, 1]);
        let e = self.endian;
        patch(&mut bytes, layout.e_type, 4u16, e);
        patch(&mut bytes, 18, if w == 4 { 3u16 } else { 62u16 }, e); // e_machine
        patch(&mut bytes, 20, 1u32, e); // e_version
        self.patch_word(&mut bytes, layout.e_phoff, ph_offset as u64);
        patch(&mut bytes, layout.e_phentsize, layout.phdr_size as u16, e);
        if self.extended_numbering {
            patch(&mut bytes, layout.e_phnum, 0xffffu16, e);
            self.patch_word(&mut bytes, layout.e_shoff, sh_offset as u64);
            patch(&mut bytes, layout.e_shentsize, layout.shdr_size as u16, e);
            patch(
                &mut bytes,
                sh_offset + layout.sh_info,
                num_segments as u32,
                e,
            );
        } else {
            patch(&mut bytes, layout.e_phnum, num_segments as u16, e);
        }

        // program headers
        let text_vaddr = if w == 4 { 0x0804_8000 } else { 0x40_0000 };
        let note = (4u32, note_offset, 0, notes.len());
        let code = (1u32, text_offset, text_vaddr, text.len());
        let stack_seg = (1u32, stack_offset, stack_vaddr, stack.len());
        let segments = if self.note_after_load {
            [code, stack_seg, note]
        } else {
            [note, code, stack_seg]
        };
        for (i, (ptype, offset, vaddr, size)) in segments.into_iter().enumerate() {
            let entry = ph_offset + i * layout.phdr_size;
            patch(&mut bytes, entry + layout.p_type, ptype, e);
            self.patch_word(&mut bytes, entry + layout.p_offset, offset as u64);
            self.patch_word(&mut bytes, entry + layout.p_vaddr, vaddr);
            self.patch_word(&mut bytes, entry + layout.p_filesz, size as u64);
        }

        BuiltCore {
            bytes,
            num_segments,
            execfn_addr,
            stack_vaddr,
            stack_offset,
            stack_len: stack.len(),
            note_offset,
            auxv_note: ByteRange {
                begin: note_offset + auxv_desc.begin,
                end: note_offset + auxv_desc.end,
            },
            argv: ByteRange {
                begin: stack_offset + argv_begin,
                end: stack_offset + argv_end,
            },
            envp: ByteRange {
                begin: stack_offset + envp_begin,
                end: stack_offset + envp_end,
            },
            platform_addr,
            random_addr,
        }
    }

    fn layout(&self) -> &'static Layout {
        if self.word_size == 4 {
            u32::LAYOUT
        } else {
            u64::LAYOUT
        }
    }

    fn auxv(&self, random: u64, platform: u64, execfn: u64, stack: bool) -> Vec<(u64, u64)> {
        let mut auxv = vec![
            (AT_HWCAP, HWCAP),
            (AT_PAGESZ, 4096),
            (AT_CLKTCK, 100),
            (AT_UID, 1000),
            (AT_UID + 1, 1000),
            (AT_UID + 2, 1000),
            (AT_UID + 3, 1000),
            (AT_SECURE, 0),
            (AT_RANDOM, random),
        ];
        if stack || self.with_execfn {
            auxv.push((AT_EXECFN, execfn));
        }
        auxv.push((AT_PLATFORM, platform));
        if stack || self.with_sentinel {
            auxv.push((0, 0));
        }
        auxv
    }

    /// Returns the NOTE segment and the range of the auxv desc within it.
    fn notes(&self, random: u64, platform: u64, execfn: u64) -> (Vec<u8>, ByteRange) {
        let mut out = Out::new(self.endian, self.word_size);

        if self.with_prpsinfo {
            let layout = &self.layout().prpsinfo;
            let pad = self.prpsinfo_padding;
            let mut desc = vec![0u8; layout.size + pad];
            desc[0] = b'S'; // pr_state
            patch(&mut desc, layout.pid + pad, self.pid, self.endian);
            let name = self.argv[0].rsplit('/').next().unwrap_or_default().as_bytes();
            let name = &name[..name.len().min(15)];
            let fname = layout.fname + pad;
            desc[fname..fname + name.len()].copy_from_slice(name);
            out.note(b"CORE\0", 3, &desc);
        }

        let mut files = Out::new(self.endian, self.word_size);
        files.word(0); // count
        files.word(4096); // page size
        out.note(b"CORE\0", 0x46494c45, &files.bytes);

        let mut auxv = Out::new(self.endian, self.word_size);
        for (key, value) in self.auxv(random, platform, execfn, false) {
            auxv.word(key);
            auxv.word(value);
        }
        let desc = out.note(b"CORE\0", 6, &auxv.bytes);
        (out.bytes, desc)
    }

    fn patch_word(&self, bytes: &mut [u8], offset: usize, value: u64) {
        if self.word_size == 4 {
            patch(bytes, offset, value as u32, self.endian);
        } else {
            patch(bytes, offset, value, self.endian);
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn patch<T: Field>(bytes: &mut [u8], offset: usize, value: T, endian: Endian) {
    bytes[offset..offset + T::SIZE].copy_from_slice(&value.to_bytes(endian));
}

struct Out {
    bytes: Vec<u8>,
    endian: Endian,
    word_size: usize,
}

impl Out {
    fn new(endian: Endian, word_size: usize) -> Self {
        Out {
            bytes: Vec::new(),
            endian,
            word_size,
        }
    }

    fn len(&self) -> usize {
        self.bytes.len()
    }

    fn word(&mut self, value: u64) {
        if self.word_size == 4 {
            self.bytes.extend((value as u32).to_bytes(self.endian));
        } else {
            self.bytes.extend(value.to_bytes(self.endian));
        }
    }

    fn string(&mut self, s: &str) {
        self.bytes.extend(s.as_bytes());
        self.bytes.push(0);
    }

    fn pad(&mut self, align: usize) {
        self.bytes.resize(self.bytes.len().next_multiple_of(align), 0);
    }

    /// Appends a note and returns the range of its desc.
    fn note(&mut self, name: &[u8], ntype: u32, desc: &[u8]) -> ByteRange {
        self.bytes.extend((name.len() as u32).to_bytes(self.endian));
        self.bytes.extend((desc.len() as u32).to_bytes(self.endian));
        self.bytes.extend(ntype.to_bytes(self.endian));
        self.bytes.extend(name);
        self.pad(4);
        let begin = self.len();
        self.bytes.extend(desc);
        let end = self.len();
        self.pad(4);
        ByteRange { begin, end }
    }
}
